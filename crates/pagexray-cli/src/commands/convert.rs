use crate::OutputFormat;
use anyhow::Result;
use pagexray_core::har::HarReader;
use pagexray_core::stats::Summary;
use pagexray_core::{ConvertConfig, PageSummary};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Read a HAR file and summarize its pages
pub fn convert_har(
    file: &Path,
    include_assets: bool,
    first_party: Option<&str>,
) -> Result<Vec<PageSummary>> {
    tracing::debug!("Reading HAR file: {}", file.display());

    let har = HarReader::from_file(file)?;
    HarReader::validate(&har)?;

    let mut config = ConvertConfig::new().with_include_assets(include_assets);
    if let Some(pattern) = first_party {
        config = config.with_first_party(pattern)?;
    }

    Ok(pagexray_core::convert(&har, &config)?)
}

pub fn execute(
    file: &Path,
    include_assets: bool,
    first_party: Option<&str>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Converting HAR file: {}", file.display());

    let pages = convert_har(file, include_assets, first_party)?;

    match output {
        Some(path) => {
            tracing::debug!("Writing {} output to: {}", format.as_str(), path.display());
            let mut writer = BufWriter::new(File::create(&path)?);
            write_pages(&mut writer, &pages, format)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_pages(&mut writer, &pages, format)?;
        }
    }

    Ok(())
}

fn write_pages<W: Write>(writer: &mut W, pages: &[PageSummary], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, pages)?;
            writeln!(writer)?;
        }
        OutputFormat::Pretty => output_pretty(writer, pages)?,
    }
    Ok(())
}

fn output_pretty<W: Write>(writer: &mut W, pages: &[PageSummary]) -> Result<()> {
    use console::style;

    for page in pages {
        writeln!(writer, "\n{}", style(&page.url).bold().cyan())?;

        if page.document_redirects > 0 {
            writeln!(
                writer,
                "  Redirects:     {} -> {}",
                style(page.document_redirects).yellow(),
                page.final_url
            )?;
        }
        writeln!(
            writer,
            "  Protocol:      {} ({})",
            page.http_version.as_str(),
            page.http_type.as_str()
        )?;
        writeln!(
            writer,
            "  Requests:      {} across {} domains",
            style(page.totals.requests).yellow(),
            page.total_domains
        )?;
        writeln!(
            writer,
            "  Transfer Size: {} bytes (content {} bytes, headers {} bytes)",
            page.totals.transfer_size, page.totals.content_size, page.totals.header_size
        )?;
        if page.missing_compression > 0 {
            writeln!(
                writer,
                "  Uncompressed:  {} text responses",
                style(page.missing_compression).red()
            )?;
        }

        writeln!(writer, "\n  {}", style("Content Types").bold())?;
        for (content_type, totals) in &page.content_types {
            if totals.requests == 0 {
                continue;
            }
            writeln!(
                writer,
                "    {:<12} {:>4} requests {:>10} bytes",
                content_type.as_str(),
                totals.requests,
                totals.transfer_size
            )?;
        }

        writeln!(writer, "\n  {}", style("Response Codes").bold())?;
        for (status, count) in &page.response_codes {
            writeln!(writer, "    {}: {}", status, count)?;
        }

        writeln!(writer, "\n  {}", style("Statistics").bold())?;
        write_summary(writer, "Expires (s)", page.expire_stats.as_ref())?;
        write_summary(writer, "Last Mod (s)", page.last_modified_stats.as_ref())?;
        write_summary(writer, "Cookies", page.cookie_stats.as_ref())?;

        if let (Some(first), Some(third)) = (&page.first_party, &page.third_party) {
            writeln!(writer, "\n  {}", style("Parties").bold())?;
            writeln!(
                writer,
                "    First Party:  {} requests, {} bytes",
                first.totals.requests, first.totals.transfer_size
            )?;
            writeln!(
                writer,
                "    Third Party:  {} requests, {} bytes",
                third.totals.requests, third.totals.transfer_size
            )?;
        }
    }

    writeln!(writer)?;
    Ok(())
}

fn write_summary<W: Write>(writer: &mut W, label: &str, summary: Option<&Summary>) -> Result<()> {
    match summary {
        Some(s) => writeln!(
            writer,
            "    {:<13} min {} / median {} / max {}",
            label, s.min, s.median, s.max
        )?,
        None => writeln!(writer, "    {:<13} no data", label)?,
    }
    Ok(())
}
