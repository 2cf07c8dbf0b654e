//! Static HTML implementation of [`BrowserDriver`]
//!
//! Pages are fetched through a [`PageFetcher`] and queried with `scraper`.
//! No scripts run: clicking an anchor follows its `href`, clicking a
//! checkbox or radio toggles it, and clicking a submit button submits the
//! enclosing form with the values filled so far. Controls that only act
//! through scripts (`href="#"` anchors, `type="button"` buttons) are refused;
//! live runs use the Chrome driver instead.
//!
//! `scraper::Html` is not `Send`, so documents are parsed inside synchronous
//! helpers and never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::browser::{BrowserDriver, DriverError, DriverFactory, DriverResult, Element};
use super::http_client::{FetchedPage, PageFetcher, PageRequest};

/// Attributes returned as absolute URLs, like the matching DOM properties
const URL_ATTRIBUTES: [&str; 3] = ["href", "action", "src"];

pub struct StaticPageDriver<F: PageFetcher> {
    fetcher: Arc<F>,
    page: Option<FetchedPage>,
    /// Field values typed via `fill`, keyed by field name
    filled: HashMap<String, String>,
    /// Checkbox/radio state toggled via `click`, keyed by `name=value`
    toggled: HashMap<String, bool>,
}

impl<F: PageFetcher> StaticPageDriver<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            page: None,
            filled: HashMap::new(),
            toggled: HashMap::new(),
        }
    }

    async fn navigate(&mut self, request: PageRequest) -> DriverResult<()> {
        debug!("Navigating: {:?} {}", request.method, request.url);
        let page = self.fetcher.fetch(&request).await?;
        self.page = Some(page);
        self.filled.clear();
        self.toggled.clear();
        Ok(())
    }

    fn page(&self) -> DriverResult<&FetchedPage> {
        self.page.as_ref().ok_or(DriverError::NoPage)
    }

    fn query(&self, selector: &str) -> DriverResult<Vec<Element>> {
        let page = self.page()?;
        let base = parse_base(&page.url)?;
        let selector = compile(selector)?;
        let document = Html::parse_document(&page.html);
        Ok(document
            .select(&selector)
            .map(|element| snapshot(element, &base))
            .collect())
    }

    /// Work out what clicking the first match of `selector` does
    fn resolve_click(&self, selector_str: &str) -> DriverResult<ClickEffect> {
        let page = self.page()?;
        let base = parse_base(&page.url)?;
        let selector = compile(selector_str)?;
        let document = Html::parse_document(&page.html);
        let element = document
            .select(&selector)
            .next()
            .ok_or_else(|| DriverError::element_not_found(selector_str))?;

        let tag = element.value().name();
        let input_type = element.value().attr("type").unwrap_or("text").to_ascii_lowercase();
        // a <button> without a type submits its form
        let button_type = element.value().attr("type").unwrap_or("submit").to_ascii_lowercase();

        match tag {
            "a" => {
                let href = element
                    .value()
                    .attr("href")
                    .ok_or_else(|| DriverError::interaction(selector_str, "anchor has no href"))?;
                if href.starts_with('#') || href.starts_with("javascript:") {
                    return Err(DriverError::interaction(selector_str, "anchor navigates by script"));
                }
                let url = base
                    .join(href)
                    .map_err(|e| DriverError::navigation(href, e.to_string()))?;
                Ok(ClickEffect::Navigate(PageRequest::get(url.to_string())))
            }
            "input" if input_type == "checkbox" || input_type == "radio" => {
                let key = toggle_key(&element).ok_or_else(|| {
                    DriverError::interaction(selector_str, "checkbox has no name or id")
                })?;
                let checked = self.is_checked(&key, &element);
                Ok(ClickEffect::Toggle {
                    key,
                    checked: if input_type == "radio" { true } else { !checked },
                })
            }
            "button" | "input"
                if (tag == "button" && button_type == "submit")
                    || (tag == "input" && matches!(input_type.as_str(), "submit" | "image")) =>
            {
                let form = element
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|ancestor| ancestor.value().name() == "form")
                    .ok_or_else(|| DriverError::interaction(selector_str, "submit control outside a form"))?;
                self.build_submission(form, element, &base).map(ClickEffect::Navigate)
            }
            _ => Err(DriverError::interaction(
                selector_str,
                format!("<{tag}> is not clickable without scripts"),
            )),
        }
    }

    fn is_checked(&self, key: &str, element: &ElementRef) -> bool {
        self.toggled
            .get(key)
            .copied()
            .unwrap_or_else(|| element.value().attr("checked").is_some())
    }

    /// Form submission request: action, method and successful controls
    fn build_submission(&self, form: ElementRef, submitter: ElementRef, base: &Url) -> DriverResult<PageRequest> {
        let action = form
            .value()
            .attr("action")
            .filter(|action| !action.is_empty())
            .map_or_else(
                || Ok(base.clone()),
                |action| base.join(action).map_err(|e| DriverError::navigation(action, e.to_string())),
            )?;
        let method = form.value().attr("method").unwrap_or("get").to_ascii_lowercase();

        let mut pairs = Vec::new();
        let controls = compile("input, select, textarea")?;
        let options = compile("option")?;
        for control in form.select(&controls) {
            let Some(name) = control.value().attr("name") else {
                continue;
            };
            if control.value().name() == "select" {
                let value = self
                    .filled
                    .get(name)
                    .cloned()
                    .or_else(|| selected_option(control, &options));
                if let Some(value) = value {
                    pairs.push((name.to_string(), value));
                }
                continue;
            }
            let input_type = control.value().attr("type").unwrap_or("text").to_ascii_lowercase();
            match input_type.as_str() {
                "submit" | "button" | "image" | "reset" => {}
                "checkbox" | "radio" => {
                    let key = toggle_key(&control).unwrap_or_default();
                    if self.is_checked(&key, &control) {
                        let value = control.value().attr("value").unwrap_or("on");
                        pairs.push((name.to_string(), value.to_string()));
                    }
                }
                _ => {
                    let value = self
                        .filled
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| control.value().attr("value").unwrap_or_default().to_string());
                    pairs.push((name.to_string(), value));
                }
            }
        }
        if let (Some(name), value) = (submitter.value().attr("name"), submitter.value().attr("value")) {
            pairs.push((name.to_string(), value.unwrap_or_default().to_string()));
        }

        trace!("Form submission to {} with {} fields", action, pairs.len());
        if method == "post" {
            Ok(PageRequest::post(action.to_string(), pairs))
        } else {
            let mut url = action;
            url.query_pairs_mut().clear().extend_pairs(pairs.iter());
            Ok(PageRequest::get(url.to_string()))
        }
    }
}

enum ClickEffect {
    Navigate(PageRequest),
    Toggle { key: String, checked: bool },
}

fn compile(selector: &str) -> DriverResult<Selector> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn parse_base(url: &str) -> DriverResult<Url> {
    Url::parse(url).map_err(|e| DriverError::navigation(url, format!("Invalid page URL: {e}")))
}

/// Value of the `selected` option, or of the first option when none is
fn selected_option(select: ElementRef, options: &Selector) -> Option<String> {
    let mut all = select.select(options);
    let first = all.next()?;
    let chosen = std::iter::once(first)
        .chain(all)
        .find(|option| option.value().attr("selected").is_some())
        .unwrap_or(first);
    Some(
        chosen
            .value()
            .attr("value")
            .map_or_else(|| chosen.text().collect::<String>().trim().to_string(), ToString::to_string),
    )
}

fn toggle_key(element: &ElementRef) -> Option<String> {
    let value = element.value();
    let name = value.attr("name").or_else(|| value.attr("id"))?;
    Some(format!("{}={}", name, value.attr("value").unwrap_or("on")))
}

fn snapshot(element: ElementRef, base: &Url) -> Element {
    let text = element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let attributes = element
        .value()
        .attrs()
        .map(|(name, value)| {
            let value = if URL_ATTRIBUTES.contains(&name) {
                base.join(value).map_or_else(|_| value.to_string(), |url| url.to_string())
            } else {
                value.to_string()
            };
            (name.to_string(), value)
        })
        .collect();

    Element::new(element.value().name(), text, attributes)
}

#[async_trait]
impl<F: PageFetcher> BrowserDriver for StaticPageDriver<F> {
    async fn open(&mut self, url: &str) -> DriverResult<()> {
        self.navigate(PageRequest::get(url)).await
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        // A static page never changes, so absence now is absence forever.
        if self.query(selector)?.is_empty() {
            return Err(DriverError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        match self.resolve_click(selector)? {
            ClickEffect::Navigate(request) => self.navigate(request).await,
            ClickEffect::Toggle { key, checked } => {
                self.toggled.insert(key, checked);
                Ok(())
            }
        }
    }

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        let element = self.find_element(selector).await?;
        if !matches!(element.tag(), "input" | "select" | "textarea") {
            return Err(DriverError::interaction(selector, "element is not a text field"));
        }
        let name = element
            .get_attribute("name")
            .or_else(|| element.get_attribute("id"))
            .ok_or_else(|| DriverError::interaction(selector, "field has no name or id"))?;
        self.filled.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn find_element(&mut self, selector: &str) -> DriverResult<Element> {
        self.query(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::element_not_found(selector))
    }

    async fn find_elements(&mut self, selector: &str) -> DriverResult<Vec<Element>> {
        self.query(selector)
    }

    async fn find_children(&mut self, scope: &str, selector: &str) -> DriverResult<Vec<Vec<Element>>> {
        let page = self.page()?;
        let base = parse_base(&page.url)?;
        let scope = compile(scope)?;
        let selector = compile(selector)?;
        let document = Html::parse_document(&page.html);
        Ok(document
            .select(&scope)
            .map(|parent| parent.select(&selector).map(|child| snapshot(child, &base)).collect())
            .collect())
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|page| page.url.as_str())
    }
}

#[async_trait]
impl<F: PageFetcher> DriverFactory for Arc<F> {
    type Driver = StaticPageDriver<F>;

    async fn new_driver(&self) -> DriverResult<StaticPageDriver<F>> {
        Ok(StaticPageDriver::new(Arc::clone(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::{FetchMethod, InMemoryFetcher};

    const HOME: &str = "https://portal.test/search/home";

    fn driver_over(fetcher: InMemoryFetcher) -> (StaticPageDriver<InMemoryFetcher>, Arc<InMemoryFetcher>) {
        let fetcher = Arc::new(fetcher);
        (StaticPageDriver::new(Arc::clone(&fetcher)), fetcher)
    }

    #[tokio::test]
    async fn test_attributes_resolve_against_page_url() {
        let html = r#"<div id="r"><a class="x" href="/search/view/ptr/abc/">  Report
            for   Oct </a></div>"#;
        let (mut driver, _) = driver_over(InMemoryFetcher::new().with_page(HOME, html));
        driver.open(HOME).await.unwrap();

        let anchor = driver.find_element("#r a").await.unwrap();
        assert_eq!(anchor.get_attribute("href"), Some("https://portal.test/search/view/ptr/abc/"));
        assert_eq!(anchor.get_attribute("class"), Some("x"));
        assert_eq!(anchor.text(), "Report for Oct");
    }

    #[tokio::test]
    async fn test_wait_for_missing_element_times_out() {
        let (mut driver, _) = driver_over(InMemoryFetcher::new().with_page(HOME, "<p>hi</p>"));
        driver.open(HOME).await.unwrap();

        let result = driver.wait_for_element("#absent", Duration::from_secs(10)).await;
        assert!(matches!(result, Err(DriverError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_form_submission_carries_filled_and_checked_fields() {
        let html = r#"
            <form action="/search/" method="get">
              <input type="hidden" name="token" value="t1">
              <input type="checkbox" class="senator_filer" name="filer_type" value="1">
              <input type="checkbox" name="other" value="2">
              <input type="text" id="fromDate" name="submitted_start_date" value="">
              <button class="btn btn-primary" type="submit">Search</button>
            </form>"#;
        let (mut driver, fetcher) = driver_over(
            InMemoryFetcher::new()
                .with_page(HOME, html)
                .with_page(
                    "https://portal.test/search/?token=t1&filer_type=1&submitted_start_date=10%2F01%2F2025",
                    "<p>results</p>",
                ),
        );
        driver.open(HOME).await.unwrap();
        driver.click("input.senator_filer").await.unwrap();
        driver.fill("#fromDate", "10/01/2025").await.unwrap();
        driver.click("button.btn.btn-primary").await.unwrap();

        let last = fetcher.requests().pop().unwrap();
        assert_eq!(last.method, FetchMethod::Get);
        assert_eq!(driver.find_element("p").await.unwrap().text(), "results");
    }

    #[tokio::test]
    async fn test_post_form_sends_fields_in_body() {
        let html = r#"
            <form method="post">
              <input type="hidden" name="csrfmiddlewaretoken" value="abc">
              <input id="agree_statement" type="checkbox" name="prohibition_agreement" value="1">
              <input type="submit" value="Continue">
            </form>"#;
        let (mut driver, fetcher) = driver_over(InMemoryFetcher::new().with_page(HOME, html));
        driver.open(HOME).await.unwrap();
        driver.click("#agree_statement").await.unwrap();
        // the canned fetcher has no page for the POST target, so navigation fails with 404
        let _ = driver.click("input[type=submit]").await;

        let last = fetcher.requests().pop().unwrap();
        assert_eq!(last.method, FetchMethod::Post);
        assert_eq!(last.url, HOME);
        assert_eq!(
            last.form,
            vec![
                ("csrfmiddlewaretoken".to_string(), "abc".to_string()),
                ("prohibition_agreement".to_string(), "1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_find_children_groups_cells_by_row() {
        let html = r"<table class='table'><tbody>
            <tr><td>1</td><td>a</td></tr>
            <tr><td>2</td><td>b</td><td>c</td></tr>
            </tbody></table>";
        let (mut driver, _) = driver_over(InMemoryFetcher::new().with_page(HOME, html));
        driver.open(HOME).await.unwrap();

        let rows = driver.find_children("table.table tbody tr", "td").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].iter().map(Element::text).collect::<Vec<_>>(), vec!["2", "b", "c"]);
    }

    #[tokio::test]
    async fn test_plain_buttons_do_not_submit() {
        let html = r#"
            <form action="/search/" method="get">
              <input type="text" name="q" value="x">
              <button id="plain" type="button">Toggle</button>
              <button id="clear" type="reset">Clear</button>
            </form>"#;
        let (mut driver, fetcher) = driver_over(InMemoryFetcher::new().with_page(HOME, html));
        driver.open(HOME).await.unwrap();

        assert!(matches!(driver.click("#plain").await, Err(DriverError::Interaction { .. })));
        assert!(matches!(driver.click("#clear").await, Err(DriverError::Interaction { .. })));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_untyped_button_submits_with_select_values() {
        let html = r#"
            <form action="/search/" method="get">
              <select name="report_type">
                <option value="annual">Annual</option>
                <option value="ptr" selected>Periodic Transaction</option>
              </select>
              <select name="state"><option>AL</option><option>AK</option></select>
              <select name="office"><option value="a">A</option><option value="b">B</option></select>
              <button>Search</button>
            </form>"#;
        let (mut driver, fetcher) = driver_over(InMemoryFetcher::new().with_page(HOME, html));
        driver.open(HOME).await.unwrap();
        driver.fill("select[name=office]", "b").await.unwrap();
        // no canned page for the results, so the navigation itself fails
        let _ = driver.click("button").await;

        let last = fetcher.requests().pop().unwrap();
        assert_eq!(last.url, "https://portal.test/search/?report_type=ptr&state=AL&office=b");
    }

    #[tokio::test]
    async fn test_script_only_anchor_is_not_clickable() {
        let html = r##"<a id="next" href="#">Next</a>"##;
        let (mut driver, _) = driver_over(InMemoryFetcher::new().with_page(HOME, html));
        driver.open(HOME).await.unwrap();

        assert!(matches!(driver.click("#next").await, Err(DriverError::Interaction { .. })));
    }
}
