//! Summary image rendered after each successful refresh.

use std::fmt::{self, Write as _};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::CountryRecord;

pub const SUMMARY_FILE: &str = "summary.svg";
pub const SUMMARY_CONTENT_TYPE: &str = "image/svg+xml";
/// How many countries the ranking shows.
pub const SUMMARY_TOP_N: i64 = 5;

const WIDTH: u32 = 640;
const ROW_HEIGHT: u32 = 34;
const FONT: &str = "Helvetica, Arial, sans-serif";

#[derive(Debug, Clone)]
pub struct SummaryArtifact {
    dir: PathBuf,
}

impl SummaryArtifact {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    /// Render and atomically replace the summary file.
    pub async fn render(
        &self,
        total_countries: i64,
        top: &[CountryRecord],
        last_refreshed_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let svg = render_summary_svg(total_countries, top, last_refreshed_at)?;
        let target = self.path();
        let tmp = self.dir.join(format!(".{SUMMARY_FILE}.tmp"));
        tokio::fs::write(&tmp, svg.as_bytes())
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .with_context(|| format!("replacing {}", target.display()))?;
        info!(path = %target.display(), total_countries, "summary image generated");
        Ok(target)
    }

    /// Bytes of the last rendered summary, or `None` if none was generated yet.
    pub async fn load(&self) -> Result<Option<Vec<u8>>> {
        read_optional(&self.path()).await
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

pub fn render_summary_svg(
    total_countries: i64,
    top: &[CountryRecord],
    last_refreshed_at: DateTime<Utc>,
) -> Result<String, fmt::Error> {
    let rows = top.len() as u32;
    let height = 170 + rows.max(1) * ROW_HEIGHT + 40;
    let mut out = String::new();

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{height}" viewBox="0 0 {WIDTH} {height}">"#
    )?;
    writeln!(out, r##"<rect width="100%" height="100%" fill="#0f172a"/>"##)?;
    text(&mut out, 32, 52, 26, "#f8fafc", true, "Country Summary")?;
    text(
        &mut out,
        32,
        92,
        18,
        "#cbd5e1",
        false,
        &format!("Total countries: {total_countries}"),
    )?;
    text(
        &mut out,
        32,
        140,
        18,
        "#f8fafc",
        true,
        &format!("Top {SUMMARY_TOP_N} by estimated GDP"),
    )?;

    if top.is_empty() {
        text(&mut out, 48, 180, 16, "#94a3b8", false, "No GDP estimates available")?;
    }
    for (i, country) in top.iter().enumerate() {
        let y = 180 + i as u32 * ROW_HEIGHT;
        let gdp = country.estimated_gdp.map(format_amount).unwrap_or_else(|| "-".into());
        text(
            &mut out,
            48,
            y,
            16,
            "#e2e8f0",
            false,
            &format!("{}. {}", i + 1, country.name),
        )?;
        writeln!(
            out,
            r##"<text x="{}" y="{y}" text-anchor="end" font-family="{FONT}" font-size="16" fill="#38bdf8">{gdp}</text>"##,
            WIDTH - 32
        )?;
    }

    text(
        &mut out,
        32,
        height - 24,
        14,
        "#94a3b8",
        false,
        &format!(
            "Last refreshed: {}",
            last_refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    )?;
    out.push_str("</svg>\n");
    Ok(out)
}

/// One left-anchored `<text>` line; `content` is escaped here.
fn text(
    out: &mut String,
    x: u32,
    y: u32,
    size: u32,
    fill: &str,
    bold: bool,
    content: &str,
) -> fmt::Result {
    let weight = if bold { r#" font-weight="bold""# } else { "" };
    writeln!(
        out,
        r#"<text x="{x}" y="{y}" font-family="{FONT}" font-size="{size}"{weight} fill="{fill}">{}</text>"#,
        escape_xml(content)
    )
}

/// Two decimals with thousands separators, e.g. `1,234,567.89`.
fn format_amount(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, gdp: Option<f64>) -> CountryRecord {
        let now = Utc::now();
        CountryRecord {
            id: 1,
            name: name.to_string(),
            capital: None,
            region: None,
            population: 1,
            currency_code: None,
            exchange_rate: None,
            estimated_gdp: gdp,
            flag_url: None,
            last_refreshed_at: now,
            created_at: now,
        }
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(100000.0), "100,000.00");
    }

    #[test]
    fn svg_lists_ranking_and_escapes_names() {
        let svg = render_summary_svg(
            250,
            &[record("Trinidad & Tobago", Some(2_500_000.0)), record("Chad", Some(0.0))],
            Utc::now(),
        )
        .unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Total countries: 250"));
        assert!(svg.contains("1. Trinidad &amp; Tobago"));
        assert!(svg.contains("2,500,000.00"));
        assert!(svg.contains("2. Chad"));
    }

    #[test]
    fn text_lines_escape_content_and_mark_bold() {
        let mut out = String::new();
        text(&mut out, 10, 20, 12, "#fff", true, "<Top> & more").unwrap();
        assert_eq!(
            out,
            "<text x=\"10\" y=\"20\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\" font-weight=\"bold\" fill=\"#fff\">&lt;Top&gt; &amp; more</text>\n"
        );

        let mut out = String::new();
        text(&mut out, 0, 0, 9, "#000", false, "plain").unwrap();
        assert!(!out.contains("font-weight"));
    }

    #[test]
    fn svg_handles_empty_ranking() {
        let svg = render_summary_svg(0, &[], Utc::now()).unwrap();
        assert!(svg.contains("No GDP estimates available"));
    }

    #[tokio::test]
    async fn render_then_load() {
        let dir = std::env::temp_dir().join(format!("country-summary-{}", uuid::Uuid::new_v4()));
        let artifact = SummaryArtifact::new(&dir);
        assert!(artifact.load().await.unwrap().is_none());

        let path = artifact
            .render(1, &[record("Chad", Some(3.0))], Utc::now())
            .await
            .unwrap();
        assert_eq!(path, dir.join(SUMMARY_FILE));
        let bytes = artifact.load().await.unwrap().expect("rendered");
        assert!(String::from_utf8(bytes).unwrap().contains("Chad"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
