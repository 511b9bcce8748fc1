//! Streaming backend: filtered scans straight over the remote sources.
//!
//! Sources are scanned in order. Matches before the requested page are
//! counted and dropped; the scan stops pulling as soon as the page is full,
//! so a page costs at most `offset + page_size` matching records of decode
//! work plus whatever non-matching records sit between them.
//!
//! Totals are exact only for sources read to the end. Every other source is
//! extrapolated from a sample: the match ratio over the sampled lines times
//! the estimated line count of the source (its size hint divided by the
//! sampled bytes per line, or a configured assumption without a hint). The
//! reported total never drops below the matches the scan actually observed.

use conduit_config::SearchConfig;
use conduit_core::entities::InspectionRecord;
use conduit_core::enums::SearchBackendKind;
use conduit_core::filter::SearchFilter;
use conduit_core::raw::RawInspection;
use conduit_core::responses::SearchPage;
use conduit_source::{ByteSource, DecodeOptions, Decoded, Decoder, DecoderConfig, RecordStream};

use crate::backend::{SearchBackend, prepare};
use crate::error::SearchError;

/// Tuning for scans and count estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_page_size: u32,
    /// Lines read per unfinished source to estimate its match count.
    pub sample_size: u32,
    /// Lines assumed per source when the transport reports no size.
    pub assumed_source_records: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for ScanOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_page_size: config.max_page_size.max(1),
            sample_size: config.sample_size.max(1),
            assumed_source_records: config.assumed_source_records,
        }
    }
}

/// What one pass over (part of) a source saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SourceTally {
    lines: u64,
    bytes: u64,
    matches: u64,
    exhausted: bool,
    size_hint: Option<u64>,
}

impl SourceTally {
    fn capture<T>(stream: &RecordStream<T>, matches: u64) -> Self {
        Self {
            lines: stream.lines_consumed(),
            bytes: stream.bytes_consumed(),
            matches,
            exhausted: stream.is_exhausted(),
            size_hint: stream.size_hint(),
        }
    }

    /// Extrapolated match count for the whole source.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn extrapolate(&self, assumed_lines: u64) -> u64 {
        if self.exhausted {
            return self.matches;
        }
        if self.lines == 0 {
            return 0;
        }
        let lines = self.lines as f64;
        let estimated_lines = match self.size_hint {
            Some(size) if self.bytes > 0 => size as f64 / (self.bytes as f64 / lines),
            _ => assumed_lines as f64,
        }
        .max(lines);
        let estimate = (self.matches as f64 / lines * estimated_lines).round() as u64;
        estimate.max(self.matches)
    }
}

/// Scans sources in the order given, decoding with a bounded buffer.
pub struct StreamingBackend<S> {
    decoder: Decoder<S>,
    sources: Vec<String>,
    options: ScanOptions,
}

impl<S: ByteSource> StreamingBackend<S> {
    pub fn new(source: S, decoder: DecoderConfig, sources: Vec<String>) -> Self {
        Self {
            decoder: Decoder::new(source, decoder),
            sources,
            options: ScanOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub const fn decoder(&self) -> &Decoder<S> {
        &self.decoder
    }

    /// Collect the requested page. Returns the page plus one tally per
    /// source the scan opened.
    async fn scan(
        &self,
        filter: &SearchFilter,
    ) -> Result<(Vec<InspectionRecord>, Vec<SourceTally>), SearchError> {
        let page_size = filter.page_size as usize;
        let mut to_skip = filter.offset();
        let mut results = Vec::with_capacity(page_size);
        let mut tallies = Vec::new();

        for source_id in &self.sources {
            if results.len() >= page_size {
                break;
            }
            let mut stream = self
                .decoder
                .decode::<RawInspection>(source_id, DecodeOptions::all())
                .await?;
            let mut matches = 0u64;
            while let Some(decoded) = stream.next().await? {
                let Some(record) = matching(decoded, filter) else {
                    continue;
                };
                matches += 1;
                if to_skip > 0 {
                    to_skip -= 1;
                    continue;
                }
                results.push(record);
                if results.len() >= page_size {
                    break;
                }
            }
            tallies.push(SourceTally::capture(&stream, matches));
        }
        Ok((results, tallies))
    }

    /// Read up to `sample_size` lines from the head of `source_id`.
    async fn sample(&self, source_id: &str, filter: &SearchFilter) -> Result<SourceTally, SearchError> {
        let mut stream = self
            .decoder
            .decode::<RawInspection>(
                source_id,
                DecodeOptions::all().with_limit(u64::from(self.options.sample_size)),
            )
            .await?;
        let mut matches = 0u64;
        while let Some(decoded) = stream.next().await? {
            if matching(decoded, filter).is_some() {
                matches += 1;
            }
        }
        Ok(SourceTally::capture(&stream, matches))
    }

    /// Total matches across all sources: `(total, exact)`.
    ///
    /// Reuses the scan's tally when it already covers a full sample, and
    /// samples separately otherwise.
    async fn count(
        &self,
        filter: &SearchFilter,
        scanned: &[SourceTally],
    ) -> Result<(u64, bool), SearchError> {
        let sample_lines = u64::from(self.options.sample_size);
        let mut total = 0u64;
        let mut exact = true;
        for (i, source_id) in self.sources.iter().enumerate() {
            let tally = match scanned.get(i) {
                Some(t) if t.exhausted || t.lines >= sample_lines => *t,
                _ => self.sample(source_id, filter).await?,
            };
            exact &= tally.exhausted;
            total += tally.extrapolate(self.options.assumed_source_records);
        }
        let observed: u64 = scanned.iter().map(|t| t.matches).sum();
        Ok((total.max(observed), exact))
    }
}

/// The validated record behind `decoded`, if it satisfies `filter`.
fn matching(decoded: Decoded<RawInspection>, filter: &SearchFilter) -> Option<InspectionRecord> {
    let Decoded::Record { value, .. } = decoded else {
        return None;
    };
    value.validate().ok().filter(|record| filter.matches(record))
}

impl<S: ByteSource> SearchBackend for StreamingBackend<S> {
    fn kind(&self) -> SearchBackendKind {
        SearchBackendKind::Streaming
    }

    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, SearchError> {
        let filter = prepare(filter, self.options.max_page_size)?;
        let (results, scanned) = self.scan(&filter).await?;
        let (total_count, count_exact) = self.count(&filter, &scanned).await?;
        tracing::debug!(
            page = filter.page,
            page_size = filter.page_size,
            returned = results.len(),
            sources_scanned = scanned.len(),
            total_count,
            count_exact,
            "streaming search"
        );
        Ok(SearchPage {
            results,
            total_count,
            page: filter.page,
            page_size: filter.page_size,
            backend: SearchBackendKind::Streaming,
            count_exact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tally(lines: u64, bytes: u64, matches: u64, size_hint: Option<u64>) -> SourceTally {
        SourceTally {
            lines,
            bytes,
            matches,
            exhausted: false,
            size_hint,
        }
    }

    #[test]
    fn exhausted_tally_is_exact() {
        let t = SourceTally {
            exhausted: true,
            ..tally(40, 4000, 7, Some(4000))
        };
        assert_eq!(t.extrapolate(10_000), 7);
    }

    #[test]
    fn extrapolates_from_size_hint() {
        // 100 lines of 100 bytes sampled, 10_000 bytes total, a quarter match.
        assert_eq!(tally(100, 10_000, 25, Some(100_000)).extrapolate(1), 250);
    }

    #[test]
    fn falls_back_to_assumed_lines() {
        assert_eq!(tally(100, 10_000, 10, None).extrapolate(5_000), 500);
    }

    #[test]
    fn never_below_observed() {
        assert_eq!(tally(100, 10_000, 10, None).extrapolate(0), 10);
        assert_eq!(tally(0, 0, 0, None).extrapolate(5_000), 0);
    }

    #[test]
    fn scan_options_follow_config() {
        let config = SearchConfig {
            max_page_size: 50,
            sample_size: 0,
            ..SearchConfig::default()
        };
        let options = ScanOptions::from(&config);
        assert_eq!(options.max_page_size, 50);
        assert_eq!(options.sample_size, 1);
    }
}
