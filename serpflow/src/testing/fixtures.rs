//! HTML fixtures modelled on real Bing result pages.

use std::fmt::Write;

/// Page 1 for "apify" (en-US): 10 organic results, one ad, two
/// people-also-ask entries and three related searches.
pub const APIFY_SERP: &str = r#"<!DOCTYPE html>
<html lang="en"><head><title>apify - Search</title></head>
<body>
<div id="b_content">
  <div id="b_tween"><span class="sb_count">About 30,100 results</span></div>
  <ol id="b_results">
    <li class="b_ad">
      <h2><a href="https://apify.com/pricing">Apify Pricing - Start for free</a></h2>
      <div class="b_adurl"><cite>apify.com/pricing</cite></div>
      <div class="b_caption"><p>Scale <strong>web scraping</strong> with a free plan and pay as you go.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><img class="favicon" src="/th?id=ODLS.apify"><cite>https://apify.com</cite></div>
      <h2><a href="https://apify.com/">Apify: Full-stack web scraping and data extraction platform</a></h2>
      <div class="b_caption"><p><strong>Apify</strong> is a full-stack platform for web scraping. Build with <strong>apify</strong> actors.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://apify.com › store</cite></div>
      <h2><a href="https://www.bing.com/ck/a?!&amp;&amp;p=abc&amp;u=a1aHR0cHM6Ly9hcGlmeS5jb20vc3RvcmU&amp;ntb=1">Apify Store: Ready-made scrapers</a></h2>
      <div class="b_caption"><p>Browse 2,000+ <strong>Apify</strong> actors for popular websites.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://docs.apify.com</cite></div>
      <h2><a href="https://docs.apify.com/">Apify Documentation</a></h2>
      <div class="b_caption"><p>Learn how to use the <strong>Apify</strong> platform and SDK.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://github.com › apify</cite></div>
      <h2><a href="https://github.com/apify">Apify · GitHub</a></h2>
      <div class="b_caption"><p>Open source <strong>web scraping</strong> and browser automation libraries.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://crawlee.dev</cite></div>
      <h2><a href="https://crawlee.dev/">Crawlee · Build reliable crawlers. Fast.</a></h2>
      <div class="b_caption"><p>Crawlee is a web scraping library maintained by <strong>Apify</strong>.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://en.wikipedia.org › wiki › Apify</cite></div>
      <h2><a href="https://en.wikipedia.org/wiki/Apify">Apify - Wikipedia</a></h2>
      <div class="b_caption"><p><strong>Apify</strong> is a Czech software company founded in 2015.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://www.linkedin.com › company › apify</cite></div>
      <h2><a href="https://www.linkedin.com/company/apify">Apify | LinkedIn</a></h2>
      <div class="b_caption"><p>Company page of <strong>Apify</strong>.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://blog.apify.com</cite></div>
      <h2><a href="https://blog.apify.com/">Apify Blog</a></h2>
      <div class="b_caption"><p>Guides on <strong>web scraping</strong>, data and AI.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://console.apify.com</cite></div>
      <h2><a href="https://console.apify.com/">Apify Console</a></h2>
      <div class="b_caption"><p>Sign in to manage your actors and runs.</p></div>
    </li>
    <li class="b_algo">
      <div class="b_attribution"><cite>https://www.g2.com › products › apify</cite></div>
      <h2><a href="https://www.g2.com/products/apify/reviews">Apify Reviews 2024</a></h2>
      <div class="b_caption"><p>Read verified reviews of <strong>Apify</strong>.</p></div>
    </li>
  </ol>
  <div id="b_context">
    <div class="b_expando"><div class="b_qa">
      <div class="b_q">What is Apify used for?</div>
      <div class="b_a">Apify is used for web scraping and browser automation. <a href="https://docs.apify.com/">docs.apify.com</a></div>
    </div></div>
    <div class="b_expando"><div class="b_qa">
      <div class="b_q">Is Apify free?</div>
      <div class="b_a">Apify has a free plan with monthly credits.</div>
    </div></div>
    <div class="b_rs"><h2>Related searches</h2><ul>
      <li><a href="/search?q=apify+pricing">apify pricing</a></li>
      <li><a href="/search?q=apify+api">apify api</a></li>
      <li><a href="/search?q=apify+alternatives">apify alternatives</a></li>
    </ul></div>
  </div>
</div>
</body></html>"#;

/// Interstitial served instead of results when Bing wants a challenge solved.
pub const CAPTCHA_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Bing</title></head>
<body><div id="b_content">
  <h1>One last step</h1>
  <p>Please solve the challenge below to continue.</p>
  <div id="b_captcha"><iframe src="https://www.bing.com/turing/captcha/challenge"></iframe></div>
</div></body></html>"#;

/// A genuine "no results" page.
pub const NO_RESULTS_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>zqxjvbnm - Search</title></head>
<body><div id="b_content"><ol id="b_results">
  <li class="b_no"><h1>There are no results for <strong>zqxjvbnm</strong></h1>
  <ul><li>Check your spelling or try different keywords</li></ul></li>
</ol></div></body></html>"#;

/// A 200 response with none of the result-page scaffolding.
pub const EMPTY_SHELL: &str =
    r#"<!DOCTYPE html><html><head><title>Bing</title></head><body><div id="hdr"></div></body></html>"#;

/// Result container present but empty, with no "no results" marker.
pub const CONTAINER_WITHOUT_RESULTS: &str = r#"<!DOCTYPE html>
<html><body><div id="b_content"><ol id="b_results"></ol></div></body></html>"#;

/// Builds a result page with `count` organic results for `term` on `page`.
///
/// URLs are unique per term, page and position.
#[must_use]
pub fn serp_page(term: &str, page: u32, count: usize) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><body><div id=\"b_content\">\
         <div id=\"b_tween\"><span class=\"sb_count\">About 1,000 results</span></div>\
         <ol id=\"b_results\">",
    );
    if count == 0 {
        let _ = write!(html, "<li class=\"b_no\">There are no results for {term}</li>");
    }
    for i in 1..=count {
        let _ = write!(
            html,
            "<li class=\"b_algo\"><h2><a href=\"https://example.com/{term}/{page}/{i}\">{term} result {page}-{i}</a></h2>\
             <div class=\"b_caption\"><p>About <strong>{term}</strong>, entry {i}.</p></div></li>"
        );
    }
    html.push_str("</ol></div></body></html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DEFAULT_SOFT_BLOCK_HINTS;

    #[test]
    fn test_result_fixtures_carry_no_block_phrases() {
        let generated = serp_page("rust", 2, 3);
        for page in [APIFY_SERP, NO_RESULTS_PAGE, CONTAINER_WITHOUT_RESULTS, generated.as_str()] {
            let lower = page.to_lowercase();
            for hint in DEFAULT_SOFT_BLOCK_HINTS {
                assert!(!lower.contains(hint), "fixture contains '{hint}'");
            }
        }
    }

    #[test]
    fn test_serp_page_shape() {
        let html = serp_page("tokio", 3, 4);
        assert_eq!(html.matches("class=\"b_algo\"").count(), 4);
        assert!(html.contains("https://example.com/tokio/3/4"));
        assert!(serp_page("tokio", 1, 0).contains("b_no"));
    }
}
