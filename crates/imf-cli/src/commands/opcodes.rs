//! Op code tables for every interface the client speaks.

use serde::Serialize;

use imf_core::proxy::{AbilityCode, AgentCode, AGENT_DESCRIPTOR, SYSTEM_ABILITY_DESCRIPTOR};
use imf_core::stub::{
    ChannelCode, ClientCode, INPUT_CLIENT_DESCRIPTOR, INPUT_DATA_CHANNEL_DESCRIPTOR,
};

#[derive(Debug, Serialize)]
pub struct OpcodeRow {
    pub interface: &'static str,
    pub code: u32,
    pub name: &'static str,
}

pub fn table() -> Vec<OpcodeRow> {
    let ability = AbilityCode::ALL.iter().map(|c| OpcodeRow {
        interface: SYSTEM_ABILITY_DESCRIPTOR,
        code: c.as_u32(),
        name: c.name(),
    });
    let agent = AgentCode::ALL.iter().map(|c| OpcodeRow {
        interface: AGENT_DESCRIPTOR,
        code: c.as_u32(),
        name: c.name(),
    });
    let client = ClientCode::ALL.iter().map(|c| OpcodeRow {
        interface: INPUT_CLIENT_DESCRIPTOR,
        code: c.as_u32(),
        name: c.name(),
    });
    let channel = ChannelCode::ALL.iter().map(|c| OpcodeRow {
        interface: INPUT_DATA_CHANNEL_DESCRIPTOR,
        code: c.as_u32(),
        name: c.name(),
    });
    ability.chain(agent).chain(client).chain(channel).collect()
}

pub fn format_text(rows: &[OpcodeRow]) -> String {
    let mut out = String::new();
    let mut current = "";
    for row in rows {
        if row.interface != current {
            if !current.is_empty() {
                out.push('\n');
            }
            out.push_str(row.interface);
            out.push('\n');
            current = row.interface;
        }
        out.push_str(&format!("  {:>3}  {}\n", row.code, row.name));
    }
    out
}

pub fn opcodes(json: bool) {
    let rows = table();
    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", format_text(&rows));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn codes_are_unique_per_interface() {
        let rows = table();
        let mut seen = HashSet::new();
        for row in &rows {
            assert!(
                seen.insert((row.interface, row.code)),
                "duplicate code {} on {}",
                row.code,
                row.interface
            );
        }
        assert_eq!(
            rows.len(),
            AbilityCode::ALL.len()
                + AgentCode::ALL.len()
                + ClientCode::ALL.len()
                + ChannelCode::ALL.len()
        );
    }

    #[test]
    fn text_groups_by_interface() {
        let text = format_text(&table());
        assert_eq!(text.lines().filter(|l| l.starts_with("ohos.")).count(), 4);
        assert!(text.contains("START_INPUT"));
    }
}
