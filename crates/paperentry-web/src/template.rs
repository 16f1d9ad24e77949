use axum::response::Html;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Render the index page, injecting the upload size limit.
pub fn render_index(max_document_mb: u32) -> Html<String> {
    let html = INDEX_HTML.replace("{{ max_document_mb }}", &max_document_mb.to_string());
    Html(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_injected() {
        let Html(html) = render_index(17);
        assert!(!html.contains("{{ max_document_mb }}"));
        assert!(html.contains("data-max-mb=\"17\""));
    }

    #[test]
    fn results_view_shows_success_count() {
        let Html(html) = render_index(20);
        assert!(html.contains("id=\"converted-heading\""));
        assert!(html.contains("'Converted Papers (' + succeeded + '/' + total + ')'"));
    }
}
