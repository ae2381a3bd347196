use crate::domain::files::raw_filename;
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// 統計首頁上的一個 xlsx 連結
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLink {
    pub url: String,
    pub text: String,
}

/// 從 NHS England Virtual Ward 統計首頁下載所有月報
pub struct StatsDownloader<S: Storage> {
    homepage: String,
    raw_dir: String,
    storage: S,
    client: Client,
}

impl<S: Storage> StatsDownloader<S> {
    pub fn new(homepage: &str, raw_dir: &str, storage: S, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            homepage: homepage.to_string(),
            raw_dir: raw_dir.to_string(),
            storage,
            client,
        })
    }

    async fn get_page_content(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// 下載首頁上所有資料檔，回傳實際寫入的檔名
    pub async fn download_all(&self, overwrite: bool) -> Result<Vec<String>> {
        tracing::info!("🌐 Fetching statistics homepage: {}", self.homepage);
        let page = self.get_page_content(&self.homepage).await?;
        let html = String::from_utf8_lossy(&page);
        let links = data_links(&html, &self.homepage)?;
        tracing::info!("🔗 Found {} data links", links.len());

        let mut seen = HashSet::new();
        let mut downloaded = Vec::new();

        for link in links {
            let filename = match link_text_to_filename(&link.text) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("Skipping link '{}': {}", link.text, e);
                    continue;
                }
            };

            // 同一個月份可能出現多次 (例如修訂版)，只取第一個
            if !seen.insert(filename.clone()) {
                tracing::debug!("Duplicate link for {}, ignoring {}", filename, link.url);
                continue;
            }

            if self.download_file(&link, &filename, overwrite).await? {
                downloaded.push(filename);
            }
        }

        Ok(downloaded)
    }

    async fn download_file(&self, link: &DataLink, filename: &str, overwrite: bool) -> Result<bool> {
        let path = format!("{}/{}", self.raw_dir, filename);

        if !overwrite && self.storage.exists(&path).await? {
            tracing::debug!("{} already exists, skipping", path);
            return Ok(false);
        }

        let content = self.get_page_content(&link.url).await?;
        self.storage.write_file(&path, &content).await?;
        tracing::info!("⬇️ Downloaded {}", path);
        Ok(true)
    }
}

/// 找出所有指向 `.xlsx` 的連結，相對路徑以首頁為基準展開
pub fn data_links(html: &str, base_url: &str) -> Result<Vec<DataLink>> {
    let base = Url::parse(base_url).map_err(|e| EtlError::InvalidConfigValueError {
        field: "urls.stats_homepage".to_string(),
        value: base_url.to_string(),
        reason: e.to_string(),
    })?;
    let selector = Selector::parse("a[href]")
        .map_err(|e| EtlError::processing(format!("Invalid selector: {}", e)))?;

    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if !is_data_link(href) {
            continue;
        }

        let url = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Ignoring malformed link '{}': {}", href, e);
                continue;
            }
        };

        let text = element.text().collect::<Vec<_>>().join(" ");
        links.push(DataLink {
            url: url.to_string(),
            text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        });
    }

    Ok(links)
}

pub fn is_data_link(href: &str) -> bool {
    href.to_ascii_lowercase().ends_with(".xlsx")
}

/// 連結文字中第一個全數字的詞是年份，它前一個詞是月份，
/// 例如 "Virtual Ward Capacity and Occupancy February 2024 (XLSX, 52KB)"
pub fn link_text_to_date(text: &str) -> Result<NaiveDate> {
    let bits: Vec<&str> = text.split_whitespace().collect();

    let year_index = bits
        .iter()
        .position(|bit| !bit.is_empty() && bit.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| EtlError::processing(format!("No year found in link text '{}'", text)))?;

    if year_index == 0 {
        return Err(EtlError::processing(format!(
            "No month before the year in link text '{}'",
            text
        )));
    }

    let month = bits[year_index - 1].trim_matches(|c: char| !c.is_alphabetic());
    let year = bits[year_index];

    NaiveDate::parse_from_str(&format!("1 {} {}", month, year), "%d %B %Y").map_err(|e| {
        EtlError::processing(format!("Cannot read a month from '{}': {}", text, e))
    })
}

pub fn link_text_to_filename(text: &str) -> Result<String> {
    link_text_to_date(text).map(raw_filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
          <h2>Latest statistics</h2>
          <a href="/statistics/wp-content/uploads/2024/03/Monthly-Virtual-Ward-February-2024.xlsx">
            Virtual Ward Capacity and Occupancy, February 2024 (XLSX, 52KB)
          </a>
          <a href="https://www.england.nhs.uk/statistics/wp-content/uploads/2024/02/Monthly-Virtual-Ward-January-2024.XLSX">January 2024 (XLSX, 50KB)</a>
          <a href="/statistics/virtual-ward-guidance.pdf">Guidance (PDF)</a>
          <a href="#top">Back to top</a>
        </body></html>
    "##;

    #[test]
    fn test_data_links_only_keeps_xlsx() {
        let links = data_links(PAGE, "https://www.england.nhs.uk/statistics/virtual-wards/").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].url,
            "https://www.england.nhs.uk/statistics/wp-content/uploads/2024/03/Monthly-Virtual-Ward-February-2024.xlsx"
        );
        assert_eq!(
            links[0].text,
            "Virtual Ward Capacity and Occupancy, February 2024 (XLSX, 52KB)"
        );
        assert_eq!(links[1].text, "January 2024 (XLSX, 50KB)");
    }

    #[test]
    fn test_link_text_to_date() {
        let date = link_text_to_date("Virtual Ward Capacity and Occupancy, February 2024 (XLSX, 52KB)").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let date = link_text_to_date("Monthly statistics September 2023").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 9, 1).unwrap());
    }

    #[test]
    fn test_link_text_without_date_is_an_error() {
        assert!(link_text_to_date("Guidance notes").is_err());
        assert!(link_text_to_date("2024 statistics").is_err());
        assert!(link_text_to_date("Notes 2024").is_err());
    }

    #[test]
    fn test_link_text_to_filename() {
        assert_eq!(
            link_text_to_filename("April 2023 (XLSX, 48KB)").unwrap(),
            "2023_04_Monthly_Virtual_Ward.xlsx"
        );
    }
}
