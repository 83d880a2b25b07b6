//! Output formatting utilities.

use agora_governance::{Dao, EventRecord, ProposalId};
use colored::Colorize;
use tabled::{Table, Tabled};

pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

pub fn print_warning(msg: &str) {
    eprintln!("{}", format!("⚠ {}", msg).yellow());
}

/// One event as `name key=value ...`.
pub fn format_event(record: &EventRecord) -> anyhow::Result<String> {
    let mut fields = match serde_json::to_value(&record.event)? {
        serde_json::Value::Object(map) => map,
        other => anyhow::bail!("event serialized as {other}"),
    };
    fields.remove("event");

    let rendered: Vec<String> = fields
        .iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        })
        .collect();
    Ok(format!("{} {}", record.event.name(), rendered.join(" ")))
}

pub fn print_events(records: &[EventRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    println!("{}", "Event Log".bold());
    println!("{}", "=".repeat(50));
    for record in records {
        let line = format_event(record)?;
        let (name, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        println!(
            "{} {} {}",
            format!("#{:<8} t={:<12}", record.block, record.timestamp).dimmed(),
            name.bright_cyan(),
            rest
        );
    }
    Ok(())
}

#[derive(Tabled)]
struct ProposalRow {
    id: String,
    state: String,
    #[tabled(rename = "for")]
    for_votes: String,
    against: String,
    abstain: String,
    quorum: String,
}

/// Proposals and treasury totals as of the engine's last committed block.
pub fn print_summary(dao: &Dao, proposals: &[ProposalId]) -> anyhow::Result<()> {
    let (block, _) = dao.clock();

    if !proposals.is_empty() {
        let rows = proposals
            .iter()
            .map(|id| -> anyhow::Result<ProposalRow> {
                let p = dao.proposal(id)?;
                Ok(ProposalRow {
                    id: id.short(),
                    state: p.state(block).to_string(),
                    for_votes: p.for_votes.to_string(),
                    against: p.against_votes.to_string(),
                    abstain: p.abstain_votes.to_string(),
                    quorum: p.quorum.to_string(),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        println!();
        println!("{}", "Proposals".bold());
        println!("{}", Table::new(rows));
    }

    let treasury = dao.treasury();
    println!();
    println!("{}", "Treasury".bold());
    println!("Total supply:   {}", dao.total_supply().to_string().bright_green());
    println!("Total revenue:  {}", treasury.total_revenue());
    println!("Reserve fund:   {}", treasury.reserve_fund());
    println!("Total burned:   {}", treasury.total_burned());
    Ok(())
}
