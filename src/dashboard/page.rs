use crate::config::toml_config::WardstatsConfig;

const INDEX_TEMPLATE: &str = include_str!("../../static/index.html");

/// 產生首頁 HTML，把設定中的標題、連結與顏色填入模板
pub fn render_index(config: &WardstatsConfig) -> String {
    let source_link = match &config.urls.source_code {
        Some(url) => format!(r#"<p><a href="{}">Source code</a></p>"#, escape_html(url)),
        None => String::new(),
    };

    INDEX_TEMPLATE
        .replace("{{HEADER}}", &escape_html(&config.dashboard.header))
        .replace("{{STATS_URL}}", &escape_html(&config.urls.stats_homepage))
        .replace("{{INFO_URL}}", &escape_html(&config.urls.virtual_wards_info))
        .replace("{{GP_POPULATION_URL}}", &escape_html(&config.urls.gp_population))
        .replace("{{BLUE}}", &config.colours.blue)
        .replace("{{DARK_BLUE}}", &config.colours.dark_blue)
        .replace("{{SOURCE_LINK}}", &source_link)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_index_fills_placeholders() {
        let config = WardstatsConfig::builtin().unwrap();
        let html = render_index(&config);

        assert!(!html.contains("{{"));
        assert!(html.contains("<title>NHS Virtual Ward Statistics</title>"));
        assert!(html.contains(&config.urls.stats_homepage));
        assert!(html.contains("background: #005EB8"));
        assert!(!html.contains("Source code"));
    }

    #[test]
    fn test_render_index_includes_notes() {
        let config = WardstatsConfig::builtin().unwrap();
        let html = render_index(&config);

        for heading in ["Introduction", "Definitions", "Notes", "Data Quality", "Data Context"] {
            assert!(html.contains(&format!("<h3>{}</h3>", heading)), "missing {}", heading);
        }
        assert!(html.contains("launched in April 2022"));
        assert!(html.contains("shown as '100%*' when hovered"));
        assert!(html.contains(&format!(r#"<a href="{}">GP registered population</a>"#, config.urls.gp_population)));
    }

    #[test]
    fn test_render_index_with_source_link() {
        let mut config = WardstatsConfig::builtin().unwrap();
        config.urls.source_code = Some("https://example.com/wardstats?a=1&b=2".to_string());
        let html = render_index(&config);
        assert!(html.contains(r#"<a href="https://example.com/wardstats?a=1&amp;b=2">Source code</a>"#));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">"#), "&lt;a href=&quot;x&quot;&gt;");
    }
}
