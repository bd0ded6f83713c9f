//! Terminal output helpers built on `colored`.

use colored::Colorize;
use unimem_types::memory::MemoryPage;
use unimem_types::platform::PlatformHistoryEntry;
use unimem_types::{MemorySource, UnifiedMemory};

pub fn check_ok(msg: &str) {
    println!("  {} {}", "\u{2714}".bright_green(), msg);
}

pub fn check_warn(msg: &str) {
    println!("  {} {}", "-".bright_yellow(), msg.yellow());
}

pub fn check_fail(msg: &str) {
    println!("  {} {}", "\u{2718}".bright_red(), msg.bright_red());
}

pub fn error(msg: &str) {
    eprintln!("  {} {}", "\u{2718}".bright_red(), msg.bright_red());
}

pub fn section(title: &str) {
    println!("  {} {}", ">>".bright_cyan().bold(), title.bold());
}

/// Key-value display: "  Label:       value".
pub fn kv(label: &str, value: &str) {
    println!("  {:<13}{}", format!("{label}:"), value);
}

pub fn hint(msg: &str) {
    println!("  {} {}", "hint:".dimmed(), msg.dimmed());
}

/// Which backend answered, and whether it was a fallback.
pub fn served_by(source: MemorySource, fell_back: bool) {
    if fell_back {
        println!(
            "  {} {}",
            "served by".dimmed(),
            format!("{source} (fallback)").bright_yellow()
        );
    } else {
        println!("  {} {}", "served by".dimmed(), source.as_str().dimmed());
    }
}

/// One memory as a compact line: id, date, content, categories.
pub fn memory_line(memory: &UnifiedMemory) {
    let mut line = format!(
        "  {}  {}  {}",
        memory.id.bright_cyan(),
        memory.created_at.format("%Y-%m-%d").to_string().dimmed(),
        memory.content
    );
    if !memory.categories.is_empty() {
        line.push_str(&format!("  [{}]", memory.categories.join(", ")).dimmed().to_string());
    }
    if let Some(score) = memory.score {
        line.push_str(&format!("  ({score:.2})"));
    }
    println!("{line}");
}

pub fn memory_detail(memory: &UnifiedMemory) {
    section(&memory.id);
    kv("Content", &memory.content);
    kv("Source", memory.source.as_str());
    kv("Created", &memory.created_at.to_rfc3339());
    if let Some(updated) = &memory.updated_at {
        kv("Updated", &updated.to_rfc3339());
    }
    if !memory.categories.is_empty() {
        kv("Categories", &memory.categories.join(", "));
    }
    if let Some(state) = &memory.state {
        kv("State", &state.to_string());
    }
    if let Some(app) = &memory.app_name {
        kv("App", app);
    }
    if let Some(user) = &memory.user_id {
        kv("User", user);
    }
    if let Some(agent) = &memory.agent_id {
        kv("Agent", agent);
    }
    if !memory.metadata.is_empty() {
        let meta = serde_json::to_string(&memory.metadata).unwrap_or_default();
        kv("Metadata", &meta);
    }
}

pub fn page(page: &MemoryPage) {
    if page.items.is_empty() {
        hint("no memories found");
        return;
    }
    for memory in &page.items {
        memory_line(memory);
    }
    println!(
        "  {}",
        format!(
            "page {}/{} ({} total)",
            page.page,
            page.pages.max(1),
            page.total
        )
        .dimmed()
    );
}

pub fn history(entries: &[PlatformHistoryEntry]) {
    for entry in entries {
        let change = match (&entry.old_memory, &entry.new_memory) {
            (Some(old), Some(new)) => format!("{old} -> {new}"),
            (None, Some(new)) => new.clone(),
            (Some(old), None) => old.clone(),
            (None, None) => String::new(),
        };
        println!(
            "  {}  {:<7} {}",
            entry.created_at.dimmed(),
            entry.event.bright_cyan(),
            change
        );
    }
}
