//! Register snapshots and their printed form

use std::io::Write;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::openocd_client::Result;

/// Register values read in one request, kept in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSnapshot {
    values: Vec<(String, u64)>,
}

impl RegisterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    /// Record `name`, replacing an earlier value for the same register
    pub fn insert(&mut self, name: &str, value: u64) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for RegisterSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Human readable label for a register name
pub fn register_label(name: &str) -> &str {
    match name {
        "pc" => "Program counter",
        "sp" => "Stack pointer",
        "lr" => "Link register",
        other => other,
    }
}

/// `"<label>: 0x<hex>"`, lowercase and unpadded
pub fn format_register_line(label: &str, value: u64) -> String {
    format!("{}: {:#x}", label, value)
}

/// Write one labelled line per register
pub fn write_report<W: Write>(out: &mut W, snapshot: &RegisterSnapshot) -> Result<()> {
    for (name, value) in snapshot.iter() {
        writeln!(out, "{}", format_register_line(register_label(name), value))?;
    }
    out.flush()?;
    Ok(())
}

/// Write the snapshot as a single JSON object line
pub fn write_json<W: Write>(out: &mut W, snapshot: &RegisterSnapshot) -> Result<()> {
    serde_json::to_writer(&mut *out, snapshot)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RegisterSnapshot {
        let mut snapshot = RegisterSnapshot::new();
        snapshot.insert("pc", 0x0800_0100);
        snapshot.insert("sp", 0x2000_1000);
        snapshot
    }

    #[test]
    fn test_format_register_line() {
        assert_eq!(format_register_line("Program counter", 0x0800_0100), "Program counter: 0x8000100");
        assert_eq!(format_register_line("r0", 0), "r0: 0x0");
        assert_eq!(format_register_line("r1", 0xDEAD_BEEF), "r1: 0xdeadbeef");
    }

    #[test]
    fn test_register_label() {
        assert_eq!(register_label("pc"), "Program counter");
        assert_eq!(register_label("sp"), "Stack pointer");
        assert_eq!(register_label("xPSR"), "xPSR");
    }

    #[test]
    fn test_write_report_exact_output() {
        let mut out = Vec::new();
        write_report(&mut out, &sample()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Program counter: 0x8000100\nStack pointer: 0x20001000\n"
        );
    }

    #[test]
    fn test_write_json_keeps_order() {
        let mut out = Vec::new();
        write_json(&mut out, &sample()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"pc\":134217984,\"sp\":536875008}\n");
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut snapshot = sample();
        snapshot.insert("pc", 1);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("pc"), Some(1));
        assert_eq!(snapshot.get("lr"), None);
    }
}
