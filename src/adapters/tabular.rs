use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::domain::model::{GeoPoint, Participant, ParticipantKind, ResultTable};
use crate::utils::error::Result;

pub const RESULT_HEADER: [&str; 6] = [
    "buffer",
    "radius_m",
    "intersects",
    "count",
    "min_distance_m",
    "feature_ids",
];

pub fn write_result_table<W: io::Write>(writer: W, table: &ResultTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RESULT_HEADER)?;

    for row in table.iter() {
        let distance = row
            .min_distance_m
            .map(|d| format!("{:.2}", d))
            .unwrap_or_default();
        wtr.write_record([
            row.buffer.clone(),
            row.radius_m.to_string(),
            row.intersects.to_string(),
            row.count.to_string(),
            distance,
            row.feature_ids.join(";"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn result_table_to_csv(table: &ResultTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_result_table(&mut buffer, table)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn export_result_table(path: impl AsRef<Path>, table: &ResultTable) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_result_table(file, table)
}

/// One line of the participants file: `id;name;type;lat;lng`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticipantRecord {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    kind: ParticipantKind,
    lat: f64,
    lng: f64,
}

impl From<ParticipantRecord> for Participant {
    fn from(record: ParticipantRecord) -> Self {
        Participant {
            id: record.id,
            name: record.name,
            kind: record.kind,
            location: GeoPoint::new(record.lng, record.lat),
        }
    }
}

impl From<&Participant> for ParticipantRecord {
    fn from(p: &Participant) -> Self {
        ParticipantRecord {
            id: p.id,
            name: p.name.clone(),
            kind: p.kind,
            lat: p.location.lat,
            lng: p.location.lon,
        }
    }
}

fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.contains(';') {
        b';'
    } else {
        b','
    }
}

/// Reads participants from CSV, accepting `;` or `,` separators.
pub fn read_participants(content: &str) -> Result<Vec<Participant>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut participants = Vec::new();
    for record in rdr.deserialize::<ParticipantRecord>() {
        let participant = Participant::from(record?);
        participant.location.validate()?;
        participants.push(participant);
    }
    tracing::debug!("Read {} participants", participants.len());
    Ok(participants)
}

pub fn read_participants_file(path: impl AsRef<Path>) -> Result<Vec<Participant>> {
    let content = std::fs::read_to_string(path)?;
    read_participants(&content)
}

pub fn write_participants<W: io::Write>(writer: W, participants: &[Participant]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    for participant in participants {
        wtr.serialize(ParticipantRecord::from(participant))?;
    }
    wtr.flush()?;
    Ok(())
}
