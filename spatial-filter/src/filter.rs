use crate::envelope::{Envelope, EnvelopeEncoder};
use crate::error::FilterError;
use crate::extension::Repository;
use crate::geometry::{cyclic_range_overlaps, range_overlaps};
use crate::index::{EnvelopeIndex, IndexOpenError};
use log::debug;
use std::time::Instant;

// Only blobs under these path segments carry feature data; everything
// else is metadata and always matches.
const FEATURE_PATH_MARKERS: [&str; 2] = ["/.sno-dataset/feature/", "/.table-dataset/feature/"];

const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Match,
    NotMatched,
}

/// Per-enumeration state: counters, the query rectangle, the open index
/// (absent when the repository has no sidecar, meaning match-all), and
/// the envelope decoder once its precision is known.
#[derive(Debug)]
pub struct FilterContext {
    count: u64,
    match_count: u64,
    started_at: Option<Instant>,
    index: Option<EnvelopeIndex>,
    bounds: Envelope,
    decoder: Option<EnvelopeEncoder>,
}

impl FilterContext {
    /// Parses the `"<w>,<s>,<e>,<n>"` argument and opens the sidecar
    /// index. A repository without a usable sidecar yields a context in
    /// match-all mode after one warning; a malformed argument or a
    /// sidecar that cannot serve the lookup is an error.
    pub fn init(repo: &Repository, filter_arg: &str) -> Result<Self, FilterError> {
        let bounds = parse_bounds(filter_arg).map_err(|err| {
            eprintln!("spatial-filter: Error: {}", err);
            err
        })?;

        let index = match EnvelopeIndex::open(repo.gitdir()) {
            Ok(index) => Some(index),
            Err(IndexOpenError::Unavailable(_)) => {
                eprintln!(
                    "spatial-filter: Warning: not available for this repository - no objects will be omitted."
                );
                None
            }
            Err(IndexOpenError::Prepare(err)) => {
                eprintln!("spatial-filter: Error: preparing lookup: {}", err);
                return Err(err.into());
            }
        };

        Ok(Self {
            count: 0,
            match_count: 0,
            started_at: None,
            index,
            bounds,
            decoder: None,
        })
    }

    /// Context with no index, for callers that already know there is no
    /// sidecar. Used by tests.
    pub fn match_all(bounds: Envelope) -> Self {
        Self {
            count: 0,
            match_count: 0,
            started_at: None,
            index: None,
            bounds,
            decoder: None,
        }
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    pub fn bounds(&self) -> &Envelope {
        &self.bounds
    }

    /// Bookkeeping done on every dispatch: counts the call, stamps the
    /// session start on the first one, and emits the periodic progress
    /// line.
    pub(crate) fn record_call(&mut self) {
        if self.count == 0 {
            self.started_at = Some(Instant::now());
        }
        self.count += 1;
        if self.count % PROGRESS_INTERVAL == 0 {
            eprint!(
                "Enumerating objects: {}    (Spatial-filter has tested {} objects)\r",
                self.match_count, self.count
            );
        }
    }

    pub(crate) fn record_match(&mut self) {
        self.match_count += 1;
    }

    /// Decides whether one blob belongs to the query rectangle.
    ///
    /// Non-feature paths match without touching the database, as do
    /// feature blobs with no recorded envelope and every blob when the
    /// index is absent.
    pub fn classify(&mut self, blob_id: &[u8], path: &str) -> Result<MatchResult, FilterError> {
        if !FEATURE_PATH_MARKERS.iter().any(|m| path.contains(m)) {
            return Ok(MatchResult::Match);
        }
        let index = match &self.index {
            Some(index) => index,
            None => return Ok(MatchResult::Match),
        };
        let envelope_bytes = match index.lookup(blob_id)? {
            Some(bytes) => bytes,
            None => return Ok(MatchResult::Match),
        };

        // The first row fixes the precision for the rest of the session
        if self.decoder.is_none() {
            self.decoder = Some(EnvelopeEncoder::for_stored_width(envelope_bytes.len())?);
        }
        let decoder = match &self.decoder {
            Some(decoder) => decoder,
            None => unreachable!(),
        };
        let envelope = decoder.decode(&envelope_bytes)?;

        let overlaps = cyclic_range_overlaps(envelope.w, envelope.e, self.bounds.w, self.bounds.e)
            && range_overlaps(envelope.s, envelope.n, self.bounds.s, self.bounds.n);
        Ok(if overlaps {
            MatchResult::Match
        } else {
            MatchResult::NotMatched
        })
    }

    /// Final accounting, consuming the context. The index connection,
    /// cached statement and decoder are all released here.
    pub fn free(self) {
        eprintln!("spatial-filter: {}", self.count);
        if let (Some(started_at), true) = (self.started_at, self.count > 0) {
            let elapsed = started_at.elapsed().as_secs_f64();
            debug!(
                "count={} matched={} elapsed={:.6}s rate={:.1}/s average={:.3}us",
                self.count,
                self.match_count,
                elapsed,
                self.count as f64 / elapsed.max(f64::EPSILON),
                elapsed / self.count as f64 * 1e6
            );
        }
    }
}

fn parse_bounds(filter_arg: &str) -> Result<Envelope, FilterError> {
    let invalid = || FilterError::InvalidBounds {
        arg: filter_arg.to_owned(),
    };
    let parts: Vec<&str> = filter_arg.split(',').collect();
    if parts.len() != 4 {
        return Err(invalid());
    }
    let mut values = [0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part.trim().parse().map_err(|_| invalid())?;
    }
    Ok(Envelope::new(values[0], values[1], values[2], values[3]))
}
