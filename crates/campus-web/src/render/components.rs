//! Shared HTML components used across all pages.
//!
//! These are maud functions that return `Markup` fragments for composition
//! into full pages. Every page is bound to the session's current
//! [`SessionState`]: the theme sets `data-theme` on `<html>` and the
//! navigation shows the login status.

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use maud::{DOCTYPE, Markup, PreEscaped, html};

use campus_core::student::major_color;
use campus_core::{Palette, SessionState, Theme};

/// Inline CSS for all pages. Colours come from the palette variables set by
/// [`palette_css`].
pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.6;color:var(--text);background:var(--bg);min-height:100vh;transition:background-color .3s,color .3s}
a{color:var(--accent);text-decoration:none}
a:hover{text-decoration:underline}
.nav{display:flex;align-items:center;gap:1.25rem;padding:.75rem 1.5rem;background:var(--surface);border-bottom:1px solid var(--border)}
.nav-brand{font-weight:700;color:var(--text)}
.nav-links{display:flex;gap:1rem;flex:1}
.nav-user{font-size:.9rem;color:var(--text2)}
main{max-width:1100px;margin:0 auto;padding:2rem 1.5rem}
h1{font-size:2rem;letter-spacing:-.02em;margin-bottom:.5rem}
.lead{color:var(--text2);margin-bottom:1.5rem}
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(300px,1fr));gap:1.5rem}
.card{background:var(--surface);border:1px solid var(--border);border-radius:8px;padding:1.25rem}
.card h2{font-size:1.1rem;margin-bottom:1rem}
.row{display:flex;align-items:center;justify-content:space-between;gap:.75rem;margin:.5rem 0}
.muted{color:var(--text2)}
.tag{display:inline-block;font-size:.8rem;padding:.1rem .55rem;border-radius:4px;border:1px solid currentColor}
.tag-blue{color:#1677ff}.tag-green{color:#389e0d}.tag-gold{color:#d48806}.tag-purple{color:#722ed1}
.tag-red{color:#cf1322}.tag-cyan{color:#08979c}.tag-volcano{color:#d4380d}
.btn{display:inline-block;font:inherit;font-size:.9rem;padding:.35rem .9rem;border-radius:6px;border:1px solid var(--border);background:var(--surface);color:var(--text);cursor:pointer;text-decoration:none}
.btn:hover{text-decoration:none;border-color:var(--accent)}
.btn-primary{background:var(--accent);border-color:var(--accent);color:#fff}
.btn-danger{background:#ff4d4f;border-color:#ff4d4f;color:#fff}
.btn-block{display:block;width:100%;text-align:center;margin:.4rem 0}
form.inline{display:inline}
.notice{padding:.75rem 1rem;border-radius:6px;border:1px solid #b7eb8f;background:rgba(82,196,26,.1);margin-bottom:1rem}
.failed{color:#cf1322}
.placeholder{color:var(--text2);font-style:italic}
table{width:100%;border-collapse:collapse;background:var(--surface)}
th,td{text-align:left;padding:.6rem .75rem;border-bottom:1px solid var(--border)}
th{font-weight:600}
.toolbar{display:flex;flex-wrap:wrap;gap:.75rem;align-items:center;margin-bottom:1rem}
input,select{font:inherit;padding:.35rem .6rem;border-radius:6px;border:1px solid var(--border);background:var(--bg);color:var(--text)}
.pager{display:flex;gap:.75rem;align-items:center;margin-top:1rem}
.fields{display:grid;grid-template-columns:1fr 1fr;gap:.75rem 1rem}
.field label{display:block;font-size:.85rem;color:var(--text2)}
.field input{width:100%}
.field-error{color:#cf1322;font-size:.8rem}
.detail p{margin:.3rem 0}
"#;

/// Inline CSS for error pages.
pub const ERROR_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;display:flex;justify-content:center;align-items:center;min-height:100vh;background:#f0f2f5;color:#000;padding:1rem}
.error-page{text-align:center;max-width:420px}
.error-page h1{font-size:1.5rem;margin-bottom:.75rem}
.error-page p{color:#666;margin-bottom:1rem;line-height:1.5}
.error-page a{color:#1677ff}
"#;

/// Content-Security-Policy header value.
///
/// Inline styles and the page script are allowed; scripts may only talk back
/// to this origin.
pub const CSP_HEADER: &str = "default-src 'none'; style-src 'unsafe-inline'; script-src 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; form-action 'self'; frame-ancestors 'none'";

/// Client script shared by every page.
///
/// - Reloads when the session's state changes in another view (server-sent
///   events from `/events/session`).
/// - Fills `[data-fragment]` placeholders by fetching their URL after the
///   page is shown.
const PAGE_SCRIPT: &str = r#"
(function(){
  if(window.EventSource){
    var es=new EventSource('/events/session');
    es.addEventListener('session',function(){es.close();location.reload();});
  }
  document.querySelectorAll('[data-fragment]').forEach(function(el){
    fetch(el.getAttribute('data-fragment'),{credentials:'same-origin'})
      .then(function(r){return r.text();})
      .then(function(html){el.innerHTML=html;})
      .catch(function(){el.innerHTML='<p class="failed">Failed to load.</p>';});
  });
})();
"#;

/// CSS custom properties for both palettes, keyed by `data-theme`.
pub fn palette_css() -> String {
    fn vars(theme: Theme) -> String {
        let Palette {
            bg_primary,
            bg_secondary,
            text_primary,
            text_secondary,
            border,
        } = theme.palette();
        format!(
            "html[data-theme={}]{{--bg:{bg_primary};--surface:{bg_secondary};--text:{text_primary};--text2:{text_secondary};--border:{border};--accent:#1677ff}}",
            theme.as_str()
        )
    }
    format!("{}\n{}", vars(Theme::Light), vars(Theme::Dark))
}

/// Render the full HTML page shell around `body_content`.
pub fn page_shell(
    title: &str,
    site_name: &str,
    session: &SessionState,
    return_to: &str,
    body_content: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" data-theme=(session.theme.as_str()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | " (site_name) }
                meta name="robots" content="noindex";
                style { (PreEscaped(palette_css())) }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                nav class="nav" {
                    a class="nav-brand" href="/" { (site_name) }
                    div class="nav-links" {
                        a href="/" { "Dashboard" }
                        a href="/students" { "Students" }
                    }
                    span class="nav-user" {
                        @if session.is_logged_in {
                            "Signed in as " strong { (session.user_name) }
                        } @else {
                            "Guest"
                        }
                    }
                    (theme_toggle(session.theme, return_to))
                }
                main { (body_content) }
                script { (PreEscaped(PAGE_SCRIPT)) }
            }
        }
    }
}

/// A button posting to `/theme/toggle`.
pub fn theme_toggle(theme: Theme, return_to: &str) -> Markup {
    let label = match theme {
        Theme::Light => "Dark mode",
        Theme::Dark => "Light mode",
    };
    html! {
        form class="inline" method="post" action="/theme/toggle" {
            input type="hidden" name="return_to" value=(return_to);
            button class="btn" type="submit" { (label) }
        }
    }
}

/// Login button (demo credentials) or logout button, depending on state.
pub fn login_control(session: &SessionState, return_to: &str) -> Markup {
    html! {
        @if session.is_logged_in {
            form class="inline" method="post" action="/logout" {
                input type="hidden" name="return_to" value=(return_to);
                button class="btn btn-danger" type="submit" { "Logout" }
            }
        } @else {
            form class="inline" method="post" action="/login" {
                input type="hidden" name="name" value="Jane Doe";
                input type="hidden" name="major" value="fragrances";
                input type="hidden" name="return_to" value=(return_to);
                button class="btn btn-primary" type="submit" { "Login (Demo)" }
            }
        }
    }
}

/// Coloured tag for a major.
pub fn major_tag(major: &str) -> Markup {
    html! {
        span class={ "tag tag-" (major_color(major)) } { (major) }
    }
}

/// Success banner for a simulated action.
pub fn notice(message: &str) -> Markup {
    html! {
        div class="notice" role="status" { (message) }
    }
}

/// Build an HTML response with security headers and an ETag.
///
/// Pages depend on per-session state, so they are never stored by shared
/// caches.
pub fn build_response(status: StatusCode, markup: Markup) -> Response {
    let html = markup.into_string();
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CSP_HEADER),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-cache"),
    );

    // ETag (xxHash of content)
    let hash = xxhash_rust::xxh3::xxh3_64(html.as_bytes());
    let etag = format!("\"{}\"", hex_fmt::HexFmt(&hash.to_be_bytes()));
    if let Ok(val) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, val);
    }

    (status, headers, html).into_response()
}

/// Accept only same-site absolute paths as redirect targets.
pub fn safe_return_to(value: Option<&str>) -> &str {
    match value {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}
