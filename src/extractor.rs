// src/extractor.rs - Contact extraction from fetched pages
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::models::ContactRecord;

const BUSINESS_TYPES: [&str; 6] = [
    "organization",
    "localbusiness",
    "professionalservice",
    "store",
    "service",
    "plumber",
];

const TITLE_SEPARATORS: [char; 5] = ['|', '-', ':', '–', '—'];

pub struct ContactExtractor {
    email_regex: Regex,
    phone_regex: Regex,
    link_selector: Selector,
    title_selector: Selector,
    body_selector: Selector,
    jsonld_selector: Selector,
}

impl ContactExtractor {
    pub fn new() -> Self {
        Self {
            email_regex: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .unwrap(),
            phone_regex: Regex::new(r"(?:\+\d{1,2}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
                .unwrap(),
            link_selector: Selector::parse("a[href]").unwrap(),
            title_selector: Selector::parse("title").unwrap(),
            body_selector: Selector::parse("body").unwrap(),
            jsonld_selector: Selector::parse(r#"script[type="application/ld+json"]"#).unwrap(),
        }
    }

    /// Pull every contact signal out of one page. Malformed HTML or embedded
    /// JSON never fails the extraction; the worst case is an empty record.
    pub fn extract(&self, html: &str, base_url: &str) -> ContactRecord {
        let document = Html::parse_document(html);
        let mut record = ContactRecord::default();

        self.extract_structured_business(&document, &mut record);

        if record.business_name.is_none() {
            record.business_name = self.extract_title_name(&document);
        }

        let text = self.rendered_text(&document);

        for m in self.email_regex.find_iter(&text) {
            record.emails.insert(m.as_str().to_string());
        }

        for m in self.phone_regex.find_iter(&text) {
            record.phones.insert(m.as_str().trim().to_string());
        }

        self.extract_links(&document, base_url, &mut record);

        debug!(
            "Extracted {} emails, {} phones from {}",
            record.emails.len(),
            record.phones.len(),
            base_url
        );

        record
    }

    /// Structured-data blocks of an organization-like type are the most
    /// reliable name/address source when present.
    fn extract_structured_business(&self, document: &Html, record: &mut ContactRecord) {
        for script in document.select(&self.jsonld_selector) {
            let block = script.text().collect::<String>();
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            // Sites embed invalid JSON here all the time; skip and move on.
            let data: Value = match serde_json::from_str(block) {
                Ok(data) => data,
                Err(_) => continue,
            };

            let nodes: Vec<&Value> = match &data {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };

            for node in nodes {
                if !Self::is_business_node(node) {
                    continue;
                }

                if record.business_name.is_none() {
                    let name = node
                        .get("name")
                        .or_else(|| node.get("legalName"))
                        .and_then(Value::as_str);
                    if let Some(name) = name {
                        record.business_name =
                            Some(name.trim().chars().take(200).collect::<String>());
                    }
                }

                if record.address.is_none() {
                    if let Some(addr) = node.get("address").filter(|a| a.is_object()) {
                        let parts: Vec<&str> = [
                            "streetAddress",
                            "addressLocality",
                            "addressRegion",
                            "postalCode",
                            "addressCountry",
                        ]
                        .iter()
                        .filter_map(|key| addr.get(*key).and_then(Value::as_str))
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .collect();

                        if !parts.is_empty() {
                            record.address =
                                Some(parts.join(", ").chars().take(300).collect::<String>());
                        }
                    }
                }
            }
        }
    }

    fn is_business_node(node: &Value) -> bool {
        let type_text = match node.get("@type") {
            Some(Value::String(s)) => s.to_lowercase(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
            _ => return false,
        };
        BUSINESS_TYPES.iter().any(|t| type_text.contains(t))
    }

    /// Fallback name source: the page title, cut at the first separator that
    /// leaves a plausibly-sized fragment.
    fn extract_title_name(&self, document: &Html) -> Option<String> {
        let title = document
            .select(&self.title_selector)
            .next()
            .map(|t| t.text().collect::<String>())?;
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

        for sep in TITLE_SEPARATORS {
            if let Some((head, _)) = title.split_once(sep) {
                let part = head.trim();
                let len = part.chars().count();
                if (2..=120).contains(&len) {
                    return Some(part.to_string());
                }
            }
        }

        let len = title.chars().count();
        if (2..=120).contains(&len) {
            Some(title)
        } else {
            None
        }
    }

    fn rendered_text(&self, document: &Html) -> String {
        document
            .select(&self.body_selector)
            .next()
            .map(|body| body.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    fn extract_links(&self, document: &Html, base_url: &str, record: &mut ContactRecord) {
        let base = Url::parse(base_url).ok();

        for element in document.select(&self.link_selector) {
            let href = match element.value().attr("href") {
                Some(href) => href.trim(),
                None => continue,
            };

            if let Some(address) = href.strip_prefix("mailto:") {
                let address = address.split('?').next().unwrap_or("").trim();
                if !address.is_empty() {
                    record.emails.insert(address.to_string());
                }
                continue;
            }

            // Absolute form when the page used relative or protocol-relative
            // hrefs; first match per platform wins.
            let resolved = match &base {
                Some(base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };

            if resolved.contains("linkedin.com/company") && record.linkedin.is_none() {
                record.linkedin = Some(resolved);
            } else if resolved.contains("twitter.com/") && record.twitter.is_none() {
                record.twitter = Some(resolved);
            } else if resolved.contains("facebook.com/") && record.facebook.is_none() {
                record.facebook = Some(resolved);
            }
        }
    }
}

impl Default for ContactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://acmeplumbing.example/";

    fn extract(html: &str) -> ContactRecord {
        ContactExtractor::new().extract(html, BASE)
    }

    #[test]
    fn structured_data_wins_over_title() {
        let html = r#"<html><head>
            <title>Some Other Name | Home</title>
            <script type="application/ld+json">
            {"@type": "LocalBusiness", "name": "Acme Plumbing Inc",
             "address": {"streetAddress": "1 Main St", "addressLocality": "Miami",
                         "addressRegion": "FL", "postalCode": "33101"}}
            </script>
        </head><body></body></html>"#;

        let record = extract(html);
        assert_eq!(record.business_name.as_deref(), Some("Acme Plumbing Inc"));
        assert_eq!(
            record.address.as_deref(),
            Some("1 Main St, Miami, FL, 33101")
        );
    }

    #[test]
    fn malformed_jsonld_is_skipped_not_fatal() {
        let html = r#"<html><head>
            <title>Acme Plumbing | Miami</title>
            <script type="application/ld+json">{not json at all</script>
        </head><body></body></html>"#;

        let record = extract(html);
        assert_eq!(record.business_name.as_deref(), Some("Acme Plumbing"));
    }

    #[test]
    fn jsonld_array_of_nodes_is_searched() {
        let html = r#"<script type="application/ld+json">
            [{"@type": "WebSite", "name": "ignored"},
             {"@type": ["Thing", "Organization"], "legalName": "Acme Plumbing LLC"}]
        </script>"#;

        let record = extract(html);
        assert_eq!(record.business_name.as_deref(), Some("Acme Plumbing LLC"));
    }

    #[test]
    fn non_business_jsonld_is_ignored() {
        let html = r#"<script type="application/ld+json">
            {"@type": "Article", "name": "How to fix a leak"}
        </script>"#;
        assert!(extract(html).business_name.is_none());
    }

    #[test]
    fn title_is_cut_at_first_separator() {
        let html = "<html><head><title>Acme Plumbing - Miami's finest</title></head></html>";
        assert_eq!(extract(html).business_name.as_deref(), Some("Acme Plumbing"));
    }

    #[test]
    fn short_preseparator_fragment_falls_through() {
        // "A" is below the 2-char floor, the full title is within bounds.
        let html = "<html><head><title>A| tiny prefix here</title></head></html>";
        assert_eq!(
            extract(html).business_name.as_deref(),
            Some("A| tiny prefix here")
        );
    }

    #[test]
    fn oversized_title_yields_no_name() {
        let long = "x".repeat(200);
        let html = format!("<html><head><title>{}</title></head></html>", long);
        assert!(extract(&html).business_name.is_none());
    }

    #[test]
    fn emails_come_from_text_and_mailto() {
        let html = r#"<html><body>
            <p>Reach jane.doe@acmeplumbing.example for quotes.</p>
            <a href="mailto:bob@acmeplumbing.example?subject=hi">Email Bob</a>
        </body></html>"#;

        let record = extract(html);
        assert!(record.emails.contains("jane.doe@acmeplumbing.example"));
        assert!(record.emails.contains("bob@acmeplumbing.example"));
        assert_eq!(record.emails.len(), 2);
    }

    #[test]
    fn phones_are_found_in_common_shapes() {
        let html = r#"<html><body>
            Call (305) 555-0100 or +1 305.555.0188 today
        </body></html>"#;

        let record = extract(html);
        assert!(record.phones.contains("(305) 555-0100"));
        assert!(record.phones.contains("+1 305.555.0188"));
    }

    #[test]
    fn first_social_link_per_platform_wins() {
        let html = r#"<html><body>
            <a href="https://linkedin.com/company/acme-plumbing">LinkedIn</a>
            <a href="https://linkedin.com/company/other-co">Other</a>
            <a href="//twitter.com/acmeplumbing">Twitter</a>
            <a href="https://facebook.com/acmeplumbing">Facebook</a>
        </body></html>"#;

        let record = extract(html);
        assert_eq!(
            record.linkedin.as_deref(),
            Some("https://linkedin.com/company/acme-plumbing")
        );
        assert_eq!(
            record.twitter.as_deref(),
            Some("https://twitter.com/acmeplumbing")
        );
        assert_eq!(
            record.facebook.as_deref(),
            Some("https://facebook.com/acmeplumbing")
        );
    }

    #[test]
    fn garbage_input_yields_empty_record() {
        let record = extract("<<<<]]]] not even close to html \u{0000}");
        assert!(record.emails.is_empty());
        assert!(record.phones.is_empty());
        assert!(record.business_name.is_none());
    }
}
