//! Web UI assets compiled into the binary.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use rust_embed::RustEmbed;

use crate::assistant::{escape_html, SUPPORTED_IMAGE_TYPES};
use crate::profile::DomainProfile;

#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Page template; only ever served filled in by [`render_index`].
const INDEX_TEMPLATE: &str = "index.html";

/// The single page, filled in for the active profile.
pub fn render_index(profile: &DomainProfile) -> Option<Html<String>> {
    let file = WebAssets::get(INDEX_TEMPLATE)?;
    let template = String::from_utf8_lossy(&file.data);

    let page = template
        .replace("{{page_title}}", &escape_html(profile.page_title))
        .replace("{{page_icon}}", &escape_html(profile.page_icon))
        .replace("{{theme_css}}", &profile.theme.css_variables())
        .replace("{{chat_blurb}}", &escape_html(profile.chat_blurb))
        .replace("{{chat_placeholder}}", &escape_html(profile.chat_placeholder))
        .replace("{{note}}", &escape_html(profile.note))
        .replace("{{title}}", &escape_html(profile.title))
        .replace("{{subtitle}}", &escape_html(profile.subtitle))
        .replace("{{footer}}", &escape_html(profile.footer))
        .replace("{{accept}}", &SUPPORTED_IMAGE_TYPES.join(","));

    Some(Html(page))
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    if path == INDEX_TEMPLATE {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    match WebAssets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                file.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_filled_per_profile() {
        let html = render_index(&DomainProfile::veterinary()).unwrap().0;
        assert!(html.contains("An AI-Powered Medical Diagnosis"));
        assert!(html.contains("--bg: #f7f8fa"));
        assert!(html.contains("accept=\"image/png,image/jpeg\""));
        assert!(!html.contains("{{"));
    }

    #[tokio::test]
    async fn test_raw_template_not_served_as_asset() {
        let resp = static_asset(Path(INDEX_TEMPLATE.to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = static_asset(Path("style.css".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_embedded_assets_present() {
        assert!(WebAssets::get("app.js").is_some());
        assert!(WebAssets::get("style.css").is_some());
    }
}
