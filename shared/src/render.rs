//! Fixed XML documents returned to aggregation clients
//!
//! The layout, including leading spaces and trailing newlines, is what the legacy
//! clients scrape, so these functions build the text by hand instead of going
//! through an XML writer. Names are inserted as-is.

use crate::leaderboard::{LeaderboardEntry, LeaderboardHandle};
use std::fmt::Write;

/// Renders the `<leaderboard>` metadata document for INFO
pub fn render_info(handle: &LeaderboardHandle, service_host: &str) -> String {
    let mut out = String::new();
    out.push_str("<leaderboard>\n");
    let _ = writeln!(
        out,
        " <url>http://{}/xml/{}.xml</url>",
        service_host, handle.id
    );
    let _ = writeln!(out, " <lbid>{}</lbid>", handle.id);
    let _ = writeln!(out, " <name>{}</name>", handle.name);
    let _ = writeln!(out, " <display_name>{}</display_name>", handle.name);
    let _ = writeln!(out, " <entries>{}</entries>", handle.entry_count);
    out.push_str(" <sortmethod>2</sortmethod>\n");
    out.push_str(" <displaytype>1</displaytype>\n");
    out.push_str("</leaderboard>\n");
    out
}

/// Renders the `<response>` document for FETCH
///
/// Entries are written in the order given. The counts come from `entries` so
/// `resultCount` always matches the number of `<entry>` elements.
pub fn render_fetch(
    app_id: u32,
    handle: &LeaderboardHandle,
    entries: &[LeaderboardEntry],
) -> String {
    let mut out = String::with_capacity(256 + entries.len() * 160);
    out.push_str("<response>\n");
    let _ = writeln!(out, "<appID>{}</appID>", app_id);
    let _ = writeln!(out, "<leaderboardID>{}</leaderboardID>", handle.id);
    let _ = writeln!(out, "<name>{}</name>", handle.name);
    out.push_str("<entryStart>0</entryStart>\n");
    let _ = writeln!(out, "<entryEnd>{}</entryEnd>", entries.len());
    let _ = writeln!(out, "<resultCount>{}</resultCount>", entries.len());
    out.push_str(" <entries>\n");

    for entry in entries {
        out.push_str("  <entry>\n");
        let _ = writeln!(out, "   <steamid>{}</steamid>", entry.steam_id);
        let _ = writeln!(out, "   <score>{}</score>", entry.score);
        let _ = writeln!(out, "   <rank>{}</rank>", entry.global_rank);
        out.push_str("   <ugcid>-1</ugcid>\n");
        let _ = writeln!(out, "   <details>{}</details>", format_details(entry));
        out.push_str("  </entry>\n");
    }

    out.push_str(" </entries>\n");
    out.push_str("</response>\n");
    out
}

/// Renders the error document sent for any failed lookup
pub fn render_error(message: &str) -> String {
    let mut out = String::new();
    out.push_str("<response>\n");
    out.push_str(" <status>0</status>\n");
    let _ = writeln!(out, " <message>{}</message>", message);
    out.push_str("</response>\n");
    out
}

/// Formats the detail blob as `XX000000YY000000`.
///
/// Only the low byte of each decoded value is kept.
pub fn format_details(entry: &LeaderboardEntry) -> String {
    let (first, second) = entry.detail_values();
    format!("{:02x}000000{:02x}000000", first & 0xff, second & 0xff)
}
