use crate::signals::{ContentSignal, DisclosureCheck, FormSignal, TransparencySignals};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

const MAX_HEADINGS: usize = 20;
const MAX_HEADING_CHARS: usize = 200;
const MAX_EXTERNAL_DOMAINS: usize = 20;
const BODY_KEEP_WHOLE_CHARS: usize = 10_000;
const BODY_HEAD_CHARS: usize = 8_000;
const BODY_TAIL_CHARS: usize = 2_000;
const ELISION_MARKER: &str = " [...] ";
const MIN_OBFUSCATION_SIGNALS: usize = 2;

/// Input name/id/autocomplete fragments that mark a payment-card field.
const CARD_FIELD_TOKENS: &[&str] = &[
    "card", "cc-number", "ccnumber", "cvv", "cvc", "cc-exp", "expiry", "securitycode",
    "security_code", "pan",
];

lazy_static! {
    static ref TITLE_SEL: Selector = Selector::parse("title").unwrap();
    static ref BODY_SEL: Selector = Selector::parse("body").unwrap();
    static ref HEADING_SEL: Selector = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();
    static ref ANCHOR_SEL: Selector = Selector::parse("a[href]").unwrap();
    static ref FORM_SEL: Selector = Selector::parse("form").unwrap();
    static ref INPUT_SEL: Selector = Selector::parse("input").unwrap();
    static ref SCRIPT_SEL: Selector = Selector::parse("script").unwrap();
    static ref STYLED_FIELD_SEL: Selector = Selector::parse("input[style], form[style]").unwrap();
    static ref HEX_ESCAPE_RUN: Regex = Regex::new(r"(\\x[0-9a-fA-F]{2}){3,}").unwrap();
    static ref UNICODE_ESCAPE_RUN: Regex = Regex::new(r"(\\u[0-9a-fA-F]{4}){3,}").unwrap();
    static ref ORGANIZATION_RE: Regex = Regex::new(
        r"(?i)会社概要|運営者|運営会社|株式会社|有限会社|corporate\s+profile|company\s+(information|profile|overview)|about\s+(us|the\s+company)"
    )
    .unwrap();
    static ref CONTACT_RE: Regex = Regex::new(
        r"(?i)お問い合わせ|お問合せ|連絡先|電話番号|contact(\s+us)?|support@|tel[:：]"
    )
    .unwrap();
    static ref PRIVACY_RE: Regex =
        Regex::new(r"(?i)プライバシーポリシー|個人情報保護方針|privacy\s*policy").unwrap();
    static ref COMMERCE_LAW_RE: Regex = Regex::new(
        r"(?i)特定商取引法?に基づく表記|特商法|terms\s+of\s+(sale|service)|return\s+policy|refund\s+policy"
    )
    .unwrap();
}

/// Turns raw fetched HTML into structured evidence. Pure: nothing here
/// executes scripts or touches the network; the base URL is only used to
/// resolve anchors.
pub fn extract_content(html: &str, base: &Url) -> ContentSignal {
    let document = Html::parse_document(html);
    let base_host = base.host_str().unwrap_or_default().to_ascii_lowercase();

    let title = document
        .select(&TITLE_SEL)
        .next()
        .map(|el| squash_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    let headings = document
        .select(&HEADING_SEL)
        .take(MAX_HEADINGS)
        .map(|el| {
            squash_whitespace(&el.text().collect::<String>())
                .chars()
                .take(MAX_HEADING_CHARS)
                .collect()
        })
        .collect();

    let mut body_text = String::new();
    let mut anchor_free_text = String::new();
    match document.select(&BODY_SEL).next() {
        Some(body) => {
            collect_visible_text(*body, &mut body_text, false);
            collect_visible_text(*body, &mut anchor_free_text, true);
        }
        None => {
            collect_visible_text(document.tree.root(), &mut body_text, false);
            collect_visible_text(document.tree.root(), &mut anchor_free_text, true);
        }
    }
    let body_text = squash_whitespace(&body_text);
    let anchor_free_text = squash_whitespace(&anchor_free_text);

    let (external_domains, external_link_total) = collect_external_domains(&document, base, &base_host);
    let link_haystack = collect_link_haystack(&document);

    ContentSignal {
        title,
        headings,
        body_excerpt: excerpt(&body_text),
        external_domains,
        external_link_total,
        forms: collect_forms(&document),
        script_obfuscation: detect_obfuscation(&document),
        hidden_field_count: count_hidden_fields(&document),
        transparency: detect_transparency(&anchor_free_text, &link_haystack),
    }
}

/// Depth-first text collection skipping `script` and `style` subtrees.
/// With `skip_anchors`, `a` subtrees are skipped too, leaving the text a
/// visitor sees outside of links.
fn collect_visible_text(node: ego_tree::NodeRef<'_, Node>, out: &mut String, skip_anchors: bool) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(element) => {
                let name = element.name();
                if name == "script" || name == "style" {
                    continue;
                }
                if skip_anchors && name == "a" {
                    continue;
                }
                collect_visible_text(child, out, skip_anchors);
            }
            _ => collect_visible_text(child, out, skip_anchors),
        }
    }
}

fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Head+tail truncation: short bodies stay whole, long ones keep the start
/// and the end so footer/legal content survives the size bound.
fn excerpt(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= BODY_KEEP_WHOLE_CHARS {
        return text.to_string();
    }
    let head: String = chars[..BODY_HEAD_CHARS].iter().collect();
    let tail: String = chars[chars.len() - BODY_TAIL_CHARS..].iter().collect();
    format!("{}{}{}", head, ELISION_MARKER, tail)
}

fn collect_external_domains(
    document: &Html,
    base: &Url,
    base_host: &str,
) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut domains = Vec::new();
    let mut total = 0;

    for anchor in document.select(&ANCHOR_SEL) {
        let href = match anchor.value().attr("href") {
            Some(href) => href,
            None => continue,
        };
        let resolved = match base.join(href) {
            Ok(resolved) => resolved,
            Err(_) => continue,
        };
        let host = match resolved.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => continue,
        };
        if host.is_empty() || host == base_host {
            continue;
        }
        total += 1;
        if seen.insert(host.clone()) && domains.len() < MAX_EXTERNAL_DOMAINS {
            domains.push(host);
        }
    }

    (domains, total)
}

/// Anchor text and href strings joined into one haystack for the
/// transparency patterns.
fn collect_link_haystack(document: &Html) -> String {
    let mut haystack = String::new();
    for anchor in document.select(&ANCHOR_SEL) {
        haystack.push_str(&squash_whitespace(&anchor.text().collect::<String>()));
        haystack.push(' ');
        if let Some(href) = anchor.value().attr("href") {
            haystack.push_str(href);
            haystack.push('\n');
        }
    }
    haystack
}

fn collect_forms(document: &Html) -> Vec<FormSignal> {
    let mut forms = Vec::new();
    for form in document.select(&FORM_SEL) {
        let mut input_count = 0;
        let mut has_password_field = false;
        let mut has_card_field = false;

        for input in form.select(&INPUT_SEL) {
            input_count += 1;
            let input_type = input
                .value()
                .attr("type")
                .unwrap_or("text")
                .to_ascii_lowercase();
            if input_type == "password" {
                has_password_field = true;
            }
            if is_card_field(input.value().attr("name"))
                || is_card_field(input.value().attr("id"))
                || is_card_field(input.value().attr("autocomplete"))
            {
                has_card_field = true;
            }
        }

        forms.push(FormSignal {
            method: form
                .value()
                .attr("method")
                .unwrap_or("get")
                .to_ascii_lowercase(),
            action: form.value().attr("action").unwrap_or("").to_string(),
            input_count,
            has_password_field,
            has_card_field,
        });
    }
    forms
}

fn is_card_field(attr: Option<&str>) -> bool {
    let value = match attr {
        Some(value) => value.to_ascii_lowercase(),
        None => return false,
    };
    CARD_FIELD_TOKENS.iter().any(|token| value.contains(token))
}

/// The flag requires at least two distinct signals inside the SAME inline
/// script block; a single `atob` in ordinary analytics code stays quiet.
fn detect_obfuscation(document: &Html) -> bool {
    for script in document.select(&SCRIPT_SEL) {
        if script.value().attr("src").is_some() {
            continue;
        }
        let code: String = script.text().collect();
        if script_block_signals(&code) >= MIN_OBFUSCATION_SIGNALS {
            return true;
        }
    }
    false
}

fn script_block_signals(code: &str) -> usize {
    let mut signals = 0;
    if code.contains("eval(") {
        signals += 1;
    }
    if code.contains("atob(") {
        signals += 1;
    }
    if code.contains("fromCharCode") {
        signals += 1;
    }
    if HEX_ESCAPE_RUN.is_match(code) {
        signals += 1;
    }
    if UNICODE_ESCAPE_RUN.is_match(code) {
        signals += 1;
    }
    if code.contains("document.write")
        && (code.contains("unescape(")
            || code.contains("decodeURIComponent(")
            || code.contains("atob("))
    {
        signals += 1;
    }
    signals
}

fn count_hidden_fields(document: &Html) -> usize {
    document
        .select(&STYLED_FIELD_SEL)
        .filter(|el| style_hides(el.value().attr("style").unwrap_or("")))
        .count()
}

fn style_hides(style: &str) -> bool {
    let normalized = style.to_ascii_lowercase();
    for declaration in normalized.split(';') {
        let mut parts = declaration.splitn(2, ':');
        let (property, value) = match (parts.next(), parts.next()) {
            (Some(property), Some(value)) => (property.trim(), value.trim()),
            _ => continue,
        };
        match property {
            "display" if value == "none" => return true,
            "visibility" if value == "hidden" => return true,
            "opacity" => {
                if value.parse::<f32>().map_or(false, |v| v == 0.0) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Matches against the FULL untruncated visible text and against link
/// text+href separately, so a disclosure living on a linked subpage is
/// recorded as present-via-link instead of absent.
fn detect_transparency(visible_text: &str, link_haystack: &str) -> TransparencySignals {
    let check = |pattern: &Regex| DisclosureCheck {
        in_text: pattern.is_match(visible_text),
        via_link: pattern.is_match(link_haystack),
    };
    TransparencySignals {
        organization: check(&ORGANIZATION_RE),
        contact: check(&CONTACT_RE),
        privacy_policy: check(&PRIVACY_RE),
        commerce_law: check(&COMMERCE_LAW_RE),
    }
}
