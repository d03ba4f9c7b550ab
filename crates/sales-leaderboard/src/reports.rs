//! Leaderboard output (console tables and CSV/JSON exports)

use anyhow::Result;
use csv::Writer;
use leaderboard_core::constants::PODIUM_SIZE;
use leaderboard_core::leaderboard::{contains_placeholder, current_user_card, medal, motivation};
use leaderboard_core::{ExchangeRateTable, LeaderboardEntry, MonthWindow, OfficeLeaderboardEntry};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::constants;

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

pub fn contract_word(count: u32) -> &'static str {
    if count == 1 { "contract" } else { "contracts" }
}

/// Truncate string with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn format_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}${}.{:02}", if negative { "-" } else { "" }, grouped, cents % 100)
}

// =============================================================================
// Console
// =============================================================================

/// Render the manager leaderboard
pub fn write_leaderboard(out: &mut impl Write, window: &MonthWindow, leaderboard: &[LeaderboardEntry]) -> Result<()> {
    writeln!(out, "🏆 Leaderboard")?;
    writeln!(out, "{} • {} managers\n", window.label(), leaderboard.len())?;

    if contains_placeholder(leaderboard) {
        writeln!(out, "📊 Demo data: real results will appear as contracts come in.\n")?;
    }

    if leaderboard.is_empty() {
        writeln!(out, "📋 No data for the selected period.")?;
        return Ok(());
    }

    for entry in leaderboard.iter().take(PODIUM_SIZE) {
        writeln!(
            out,
            "{} {}{}  {}",
            medal(entry.rank).unwrap_or("  "),
            entry.manager.manager_name,
            if entry.is_current_user { " (you)" } else { "" },
            motivation(entry.rank)
        )?;
        writeln!(
            out,
            "     {} • {} • {} {}",
            entry.manager.office_name,
            format_usd(entry.manager.total_commission_usd),
            entry.manager.contract_count,
            contract_word(entry.manager.contract_count)
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "{:>4}  {:<24} {:<18} {:>14} {:>9}",
        "Rank", "Manager", "Office", "Commission", "Contracts"
    )?;
    writeln!(out, "{}", "-".repeat(73))?;

    for entry in leaderboard {
        writeln!(
            out,
            "{:>4}  {:<24} {:<18} {:>14} {:>9}{}",
            entry.rank,
            truncate(&entry.manager.manager_name, 24),
            truncate(&entry.manager.office_name, 18),
            format_usd(entry.manager.total_commission_usd),
            entry.manager.contract_count,
            if entry.is_current_user { "  ◀ you" } else { "" }
        )?;
    }

    if let Some(me) = current_user_card(leaderboard) {
        writeln!(out, "{}", "-".repeat(73))?;
        writeln!(
            out,
            "Your position: #{} of {} • {} • {} {} • {}",
            me.rank,
            leaderboard.len(),
            format_usd(me.manager.total_commission_usd),
            me.manager.contract_count,
            contract_word(me.manager.contract_count),
            motivation(me.rank)
        )?;
    }

    Ok(())
}

pub fn print_leaderboard(window: &MonthWindow, leaderboard: &[LeaderboardEntry]) -> Result<()> {
    write_leaderboard(&mut std::io::stdout().lock(), window, leaderboard)
}

/// Render the office leaderboard
pub fn write_offices(out: &mut impl Write, window: &MonthWindow, offices: &[OfficeLeaderboardEntry]) -> Result<()> {
    writeln!(out, "🏢 Offices • {}\n", window.label())?;

    if offices.is_empty() {
        writeln!(out, "📋 No data for the selected period.")?;
        return Ok(());
    }

    writeln!(out, "{:>4}  {:<24} {:>14} {:>9}", "Rank", "Office", "Commission", "Contracts")?;
    writeln!(out, "{}", "-".repeat(55))?;
    for entry in offices {
        writeln!(
            out,
            "{:>4}  {:<24} {:>14} {:>9}{}",
            entry.rank,
            truncate(&entry.office.office_name, 24),
            format_usd(entry.office.total_commission_usd),
            entry.office.contract_count,
            if entry.is_current_office { "  ◀ your office" } else { "" }
        )?;
    }

    Ok(())
}

pub fn print_offices(window: &MonthWindow, offices: &[OfficeLeaderboardEntry]) -> Result<()> {
    write_offices(&mut std::io::stdout().lock(), window, offices)
}

/// Render the resolved rate for every currency in the table
pub fn print_rates(rates: &ExchangeRateTable, source: impl std::fmt::Display) {
    println!("Exchange rates ({})\n", source);
    println!("{:<6} {:>14}", "Code", "Rate");
    println!("{}", "-".repeat(21));
    for code in rates.currencies() {
        println!("{:<6} {:>14.4}", code, rates.rate(code));
    }
}

// =============================================================================
// Exports
// =============================================================================

/// Default export path for a month, e.g. `output/leaderboard_2025-03.csv`
pub fn export_path(output_dir: &Path, window: &MonthWindow, format: ExportFormat) -> PathBuf {
    output_dir.join(format!(
        "{}_{}.{}",
        constants::EXPORT_FILENAME_STEM,
        window.key(),
        format.extension()
    ))
}

pub fn export_leaderboard(path: &Path, leaderboard: &[LeaderboardEntry], format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Csv => export_csv(path, leaderboard),
        ExportFormat::Json => {
            let file = std::fs::File::create(path)?;
            serde_json::to_writer_pretty(file, leaderboard)?;
            Ok(())
        }
    }
}

fn export_csv(path: &Path, leaderboard: &[LeaderboardEntry]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        "Rank",
        "Manager_ID",
        "Manager",
        "Office",
        "Commission_USD",
        "Contracts",
        "Current_User",
    ])?;

    for entry in leaderboard {
        wtr.write_record([
            &entry.rank.to_string(),
            &entry.manager.manager_id,
            &entry.manager.manager_name,
            &entry.manager.office_name,
            &format!("{:.2}", entry.manager.total_commission_usd),
            &entry.manager.contract_count.to_string(),
            &entry.is_current_user.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
