//! Parsing for Valkey diagnostic text output.
//!
//! All parsing functions are pure: same input always produces the same
//! output, and none of them touch the network.

use std::collections::HashMap;

use regex::Regex;

use super::types::{ClientSession, MemberRow, MemberTable, ReplicaEntry, ReplicaListing};
use crate::error::ParseError;

/// Index of the first slot token in a `CLUSTER NODES` row.
const SLOT_FIELDS_START: usize = 8;

/// Parse key-value pairs from INFO command output.
///
/// INFO output format: `key:value` per line, with optional section headers
/// starting with `#`. Lines without a colon are ignored.
///
/// # Example
/// ```
/// use valkey_fleet::client::parsing::parse_info_block;
///
/// let info = "# Replication\nrole:master\nconnected_clients:5\n";
/// let parsed = parse_info_block(info);
/// assert_eq!(parsed.get("role"), Some(&"master".to_string()));
/// ```
pub fn parse_info_block(info: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();

    for line in info.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            result.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    result
}

/// Parse `CLUSTER NODES` output into a [`MemberTable`].
///
/// Row format:
/// `<id> <ip:port@cport[,hostname]> <flags> <master> <ping-sent> <pong-recv> <config-epoch> <link-state> <slot> <slot> ...`
pub fn parse_member_table(output: &str) -> Result<MemberTable, ParseError> {
    let rows = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_member_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MemberTable { rows })
}

fn parse_member_row(line: &str) -> Result<MemberRow, ParseError> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < SLOT_FIELDS_START {
        return Err(ParseError::InvalidClusterNodes(format!(
            "Not enough fields in line: {}",
            line
        )));
    }

    let address = fields[1].split('@').next().unwrap_or_default().to_string();
    let flags: Vec<&str> = fields[2].split(',').collect();
    let primary_id = match fields[3] {
        "-" | "" => None,
        id => Some(id.to_string()),
    };

    Ok(MemberRow {
        node_id: fields[0].to_string(),
        address,
        myself: flags.contains(&"myself"),
        failed: flags.iter().any(|f| *f == "fail" || *f == "fail?" || *f == "pfail"),
        primary_id,
        slot_spec: fields[SLOT_FIELDS_START..].join(" "),
    })
}

/// Extract replica addresses from a primary's `INFO REPLICATION` output.
///
/// Replica fields look like
/// `slave0:ip=10.0.0.2,port=6379,state=online,offset=1234,lag=0`.
/// Entries are returned sorted by field name. An entry without a usable
/// ip/port lands in [`ReplicaListing::invalid`] and does not affect the rest.
pub fn parse_replica_entries(info: &str) -> Result<ReplicaListing, ParseError> {
    let field_regex = Regex::new(r"^slave\d+$")
        .map_err(|e| ParseError::InvalidReplicaEntry(format!("Failed to compile regex: {}", e)))?;

    let mut fields: Vec<(String, String)> = parse_info_block(info)
        .into_iter()
        .filter(|(key, _)| field_regex.is_match(key))
        .collect();
    fields.sort_by(|(a, _), (b, _)| (a.len(), a.as_str()).cmp(&(b.len(), b.as_str())));

    let mut listing = ReplicaListing::default();
    for (field, value) in fields {
        match parse_replica_entry(field.clone(), &value) {
            Ok(entry) => listing.entries.push(entry),
            Err(e) => listing.invalid.push((field, e)),
        }
    }
    Ok(listing)
}

fn parse_replica_entry(field: String, value: &str) -> Result<ReplicaEntry, ParseError> {
    let pairs: HashMap<&str, &str> = value
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .collect();

    let (Some(ip), Some(port)) = (pairs.get("ip"), pairs.get("port")) else {
        return Err(ParseError::InvalidReplicaEntry(format!(
            "{} has no ip/port: {}",
            field, value
        )));
    };
    if port.parse::<u16>().is_err() {
        return Err(ParseError::InvalidReplicaEntry(format!(
            "{} has invalid port: {}",
            field, port
        )));
    }

    Ok(ReplicaEntry {
        address: format!("{}:{}", ip, port),
        state: pairs.get("state").map(|s| s.to_string()),
        field,
    })
}

/// Parse `CLIENT LIST` output, one session per line.
pub fn parse_client_list(output: &str) -> Vec<ClientSession> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut session = ClientSession::default();
            for (key, value) in line.split(' ').filter_map(|field| field.split_once('=')) {
                match key {
                    "id" => session.id = value.to_string(),
                    "addr" => session.addr = value.to_string(),
                    "name" => session.name = value.to_string(),
                    "flags" => session.flags = value.to_string(),
                    "cmd" => session.cmd = value.to_string(),
                    _ => {}
                }
            }
            session
        })
        .collect()
}

/// Split `host:port` into its parts. IPv6 hosts may be bracketed.
pub fn split_host_port(address: &str) -> Result<(String, u16), ParseError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ParseError::InvalidAddress(address.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(ParseError::InvalidAddress(address.to_string()));
    }
    let port = port
        .parse()
        .map_err(|_| ParseError::InvalidAddress(address.to_string()))?;
    Ok((host.to_string(), port))
}
