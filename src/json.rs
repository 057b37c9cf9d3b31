//! Events stored as JSON lines
//!
//! Each line holds one detector event with its generator record. The
//! record types mirror the in-memory model, with particle types as plain
//! PDG codes.
use std::{
    fs::File,
    io::{BufRead, BufReader},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use log::debug;

use particle_id::ParticleID;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    event::{
        Event, EventRecord, GenieRecord, PrimaryParticle, PrimaryVertex, Segment,
        StdHepParticle, Trajectory,
    },
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonEventRecord {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub primaries: Vec<JsonVertex>,
    #[serde(default)]
    pub trajectories: Vec<JsonTrajectory>,
    #[serde(default)]
    pub segment_detectors: Vec<JsonDetector>,
    #[serde(default)]
    pub genie: Vec<JsonStdHep>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonVertex {
    #[serde(default)]
    pub position: [f64; 4],
    pub particles: Vec<JsonPrimary>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonPrimary {
    pub track_id: i32,
    pub pdg: i32,
    pub p: [f64; 4],
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonTrajectory {
    pub track_id: i32,
    pub parent_id: i32,
    pub pdg: i32,
    pub p: [f64; 4],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<[f64; 4]>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonDetector {
    pub name: String,
    pub segments: Vec<JsonSegment>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonSegment {
    pub contributors: Vec<i32>,
    pub primary_id: i32,
    #[serde(default)]
    pub start: [f64; 4],
    pub stop: [f64; 4],
    pub energy_deposit: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonStdHep {
    pub status: i32,
    pub pdg: i32,
    /// (px, py, pz, E) in GeV
    pub p4: [f64; 4],
}

impl From<JsonEventRecord> for EventRecord {
    fn from(source: JsonEventRecord) -> Self {
        let primaries = source
            .primaries
            .into_iter()
            .map(|vx| PrimaryVertex {
                position: vx.position,
                particles: vx
                    .particles
                    .into_iter()
                    .map(|p| PrimaryParticle {
                        track_id: p.track_id,
                        id: ParticleID::new(p.pdg),
                        p: p.p,
                    })
                    .collect(),
            })
            .collect();
        let trajectories = source
            .trajectories
            .into_iter()
            .map(|t| Trajectory {
                track_id: t.track_id,
                parent_id: t.parent_id,
                id: ParticleID::new(t.pdg),
                p: t.p,
                points: t.points,
            })
            .collect();
        let segment_detectors = source
            .segment_detectors
            .into_iter()
            .map(|det| {
                let segments = det
                    .segments
                    .into_iter()
                    .map(|s| Segment {
                        contributors: s.contributors,
                        primary_id: s.primary_id,
                        start: s.start,
                        stop: s.stop,
                        energy_deposit: s.energy_deposit,
                    })
                    .collect();
                (det.name, segments)
            })
            .collect();
        let genie = GenieRecord {
            particles: source
                .genie
                .into_iter()
                .map(|p| StdHepParticle {
                    status: p.status.into(),
                    id: ParticleID::new(p.pdg),
                    p4: p.p4,
                })
                .collect(),
        };
        Self {
            event: Event {
                id: source.id,
                primaries,
                trajectories,
                segment_detectors,
            },
            genie,
        }
    }
}

impl From<EventRecord> for JsonEventRecord {
    fn from(source: EventRecord) -> Self {
        let EventRecord { event, genie } = source;
        Self {
            id: event.id,
            primaries: event
                .primaries
                .into_iter()
                .map(|vx| JsonVertex {
                    position: vx.position,
                    particles: vx
                        .particles
                        .into_iter()
                        .map(|p| JsonPrimary {
                            track_id: p.track_id,
                            pdg: p.id.id(),
                            p: p.p,
                        })
                        .collect(),
                })
                .collect(),
            trajectories: event
                .trajectories
                .into_iter()
                .map(|t| JsonTrajectory {
                    track_id: t.track_id,
                    parent_id: t.parent_id,
                    pdg: t.id.id(),
                    p: t.p,
                    points: t.points,
                })
                .collect(),
            segment_detectors: event
                .segment_detectors
                .into_iter()
                .map(|(name, segments)| JsonDetector {
                    name,
                    segments: segments
                        .into_iter()
                        .map(|s| JsonSegment {
                            contributors: s.contributors,
                            primary_id: s.primary_id,
                            start: s.start,
                            stop: s.stop,
                            energy_deposit: s.energy_deposit,
                        })
                        .collect(),
                })
                .collect(),
            genie: genie
                .particles
                .into_iter()
                .map(|p| JsonStdHep {
                    status: p.status.into(),
                    pdg: p.id.id(),
                    p4: p.p4,
                })
                .collect(),
        }
    }
}

/// Iterator over the records in a JSON lines stream
///
/// Blank lines are skipped.
#[derive(Debug)]
pub struct Reader<R, T> {
    stream: R,
    buf: String,
    line: usize,
    record: PhantomData<T>,
}

impl<R: BufRead, T: DeserializeOwned> Reader<R, T> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buf: String::new(),
            line: 0,
            record: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for Reader<R, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.stream.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(err) => return Some(Err(err.into())),
            }
            if self.buf.trim().is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                serde_json::from_str(&self.buf)
                    .map_err(|source| Error::Json { line, source }),
            );
        }
    }
}

/// Open a JSON lines file
pub fn open<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Reader<BufReader<File>, T>> {
    let file = File::open(path)?;
    Ok(Reader::new(BufReader::new(file)))
}

/// Read all events from a JSON lines file
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<EventRecord>> {
    open::<JsonEventRecord>(path)?
        .map(|record| record.map(EventRecord::from))
        .collect()
}

/// Events from several JSON lines files, read one after the other
///
/// Each file is opened when the previous one is exhausted. Errors carry
/// the path of the file they come from.
pub fn events<P: AsRef<Path>>(
    paths: &[P],
) -> impl Iterator<Item = Result<EventRecord>> + '_ {
    paths.iter().flat_map(|path| {
        let path = path.as_ref();
        debug!("Reading events from {path:?}");
        let (reader, open_err) = match open::<JsonEventRecord>(path) {
            Ok(reader) => (Some(reader), None),
            Err(err) => (None, Some(Err(err))),
        };
        open_err
            .into_iter()
            .chain(reader.into_iter().flatten())
            .map(move |record| {
                record.map(EventRecord::from).map_err(|err| Error::Input {
                    path: path.to_owned(),
                    source: Box::new(err),
                })
            })
    })
}

/// Number of non-blank lines in a JSON lines file
///
/// The records are not parsed.
pub fn count_records(path: impl AsRef<Path>) -> Result<usize> {
    let mut count = 0;
    for line in BufReader::new(File::open(path)?).lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Expand wildcards in input file names
///
/// Matches are sorted by name. A pattern that matches nothing, or is not
/// a valid pattern, is kept as it is.
pub fn expand_paths<P: AsRef<Path>>(patterns: &[P]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let nmatched = paths.len();
        if let Some(matches) = pattern.to_str().and_then(|p| glob::glob(p).ok()) {
            for path in matches {
                paths.push(path.map_err(glob::GlobError::into_error)?);
            }
        }
        if paths.len() == nmatched {
            paths.push(pattern.to_owned());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EVENT: &str = r#"{"id":3,"primaries":[{"position":[0,430,0,0],"particles":[{"track_id":0,"pdg":13,"p":[1000,0,0,994]}]}],"trajectories":[{"track_id":0,"parent_id":-1,"pdg":13,"p":[1000,0,0,994],"points":[[0,430,0,0],[0,430,3000,10]]},{"track_id":1,"parent_id":0,"pdg":11,"p":[2,0,1,0]}],"segment_detectors":[{"name":"volTPCActive","segments":[{"contributors":[0,1],"primary_id":0,"stop":[0,430,600,2],"energy_deposit":2.1}]}],"genie":[{"status":0,"pdg":14,"p4":[0,0,1.2,1.2]}]}"#;

    #[test]
    fn parse_event() {
        let record: JsonEventRecord = serde_json::from_str(EVENT).unwrap();
        let EventRecord { event, genie } = record.clone().into();
        assert_eq!(event.id, Some(3));
        assert_eq!(event.primaries[0].particles[0].id.id(), 13);
        assert_eq!(event.trajectories.len(), 2);
        assert_eq!(event.trajectories[0].points.len(), 2);
        assert!(event.trajectories[1].points.is_empty());
        let segments: Vec<_> = event.segments().collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].key_contributor(), Some(0));
        assert_eq!(segments[0].start, [0.; 4]);
        assert_eq!(genie.particles[0].status, crate::event::Status::Initial);

        let back = JsonEventRecord::from(EventRecord { event, genie });
        assert_eq!(back, record);
    }

    #[test]
    fn lines() {
        let input = format!("{EVENT}\n\n{{}}\n   \n");
        let records: Vec<JsonEventRecord> = Reader::new(Cursor::new(input))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], JsonEventRecord::default());
    }

    #[test]
    fn bad_line() {
        let input = format!("{EVENT}\n{{\"id\": \"three\"}}\n");
        let mut reader = Reader::<_, JsonEventRecord>::new(Cursor::new(input));
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(Error::Json { line, .. })) => assert_eq!(line, 2),
            other => panic!("Expected parse error, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    fn tmpdir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("edep-truth-json-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn chained_files() {
        let dir = tmpdir("chained");
        let (a, b) = (dir.join("a.jsonl"), dir.join("b.jsonl"));
        std::fs::write(&a, format!("{EVENT}\n\n{EVENT}\n")).unwrap();
        std::fs::write(&b, format!("{EVENT}\nnot json\n")).unwrap();
        assert_eq!(count_records(&a).unwrap(), 2);
        assert_eq!(count_records(&b).unwrap(), 2);

        let files = [a, b.clone()];
        let mut records = events(&files);
        for _ in 0..3 {
            assert_eq!(records.next().unwrap().unwrap().event.id, Some(3));
        }
        match records.next() {
            Some(Err(Error::Input { path, source })) => {
                assert_eq!(path, b);
                assert!(matches!(*source, Error::Json { line: 2, .. }));
            }
            other => panic!("Expected parse error, got {other:?}"),
        }
        assert!(records.next().is_none());

        let missing = [dir.join("missing.jsonl")];
        let mut records = events(&missing);
        match records.next() {
            Some(Err(Error::Input { path, source })) => {
                assert_eq!(path, missing[0]);
                assert!(matches!(*source, Error::Io(_)));
            }
            other => panic!("Expected I/O error, got {other:?}"),
        }
        assert!(records.next().is_none());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn wildcards() {
        let dir = tmpdir("wildcards");
        for name in ["b.jsonl", "a.jsonl", "c.txt"] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        let missing = dir.join("missing_*.jsonl");
        let literal = dir.join("c.txt");
        let paths = expand_paths(&[dir.join("*.jsonl"), missing.clone(), literal.clone()])
            .unwrap();
        assert_eq!(
            paths,
            [dir.join("a.jsonl"), dir.join("b.jsonl"), missing, literal]
        );
        std::fs::remove_dir_all(dir).unwrap();
    }
}
