//! Pagination through a real browser over a script-driven listing.
//!
//! Needs a local Chrome or Chromium: `cargo test -- --ignored`.

use std::time::Duration;

use efd_ptr_harvester::application::PaginationTraversal;
use efd_ptr_harvester::infrastructure::{BrowserDriver, ChromeConfig, ChromeSession, PortalSelectors};

const LISTING: &str = r##"<!doctype html>
<html><body>
  <table id="filedReports"><tbody id="rows"></tbody></table>
  <a id="filedReports_next" class="paginate_button next" href="#">Next</a>
  <script>
    const pages = [["a", "b"], ["c"], ["c", "d"]];
    let current = 0;
    const render = () => {
      document.getElementById("rows").innerHTML = pages[current]
        .map((id) => `<tr><td><a href="https://efd.test/search/view/ptr/${id}/">PTR</a></td></tr>`)
        .join("");
      document.getElementById("filedReports_next").className =
        current + 1 === pages.length ? "paginate_button next disabled" : "paginate_button next";
    };
    document.getElementById("filedReports_next").addEventListener("click", (event) => {
      event.preventDefault();
      if (current + 1 < pages.length) {
        current += 1;
        render();
      }
    });
    render();
  </script>
</body></html>"##;

#[tokio::test]
#[ignore = "launches a local Chrome"]
async fn chrome_pages_through_a_script_driven_listing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listing.html");
    std::fs::write(&path, LISTING).unwrap();
    let url = url::Url::from_file_path(&path).unwrap();

    let session = ChromeSession::launch(ChromeConfig {
        args: vec!["--no-sandbox".to_string()],
        settle: Duration::from_millis(200),
        ..Default::default()
    })
    .await
    .unwrap();
    let mut driver = session.open_driver().await.unwrap();
    driver.open(url.as_str()).await.unwrap();

    let summary = PaginationTraversal::new("https://efd.test", PortalSelectors::default())
        .collect(&mut driver)
        .await;
    session.close().await;

    let summary = summary.unwrap();
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.links.len(), 4);
}
