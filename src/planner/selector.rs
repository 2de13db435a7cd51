//! Segment selection driven by the audio energy profile
//!
//! All arithmetic is done in whole milliseconds so the selected durations
//! add up to exactly the requested total.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::model::{EnergyProfile, MediaAsset, Segment, SegmentBucket};
use crate::error::{MontageError, MontageResult};

/// Spacing between candidate window starts
const CANDIDATE_STEP_MS: u64 = 250;

/// Extra distance required between selected starts on top of the window length
const MIN_GAP_MS: u64 = 1_000;

/// Segment count had to be reduced below the bucket minimum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityWarning {
    pub requested: usize,
    pub granted: usize,
    pub message: String,
}

/// An analyzed source offered to the selector
#[derive(Debug, Clone, Copy)]
pub struct SourceProfile<'a> {
    pub asset: &'a MediaAsset,
    pub profile: &'a EnergyProfile,
}

/// Result of a selection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Segments in source order, chronological within each source
    pub segments: Vec<Segment>,
    pub warning: Option<FeasibilityWarning>,
}

impl Selection {
    pub fn total_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }
}

/// How the winning windows were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    GreedyWithGap,
    Greedy,
    PerSlot,
    Uniform,
}

/// Piecewise-constant integral of the energy profile, in ms
struct EnergyIntegral {
    bounds: Vec<f64>,
    prefix: Vec<f64>,
    scores: Vec<f64>,
}

impl EnergyIntegral {
    fn new(profile: &EnergyProfile) -> Self {
        let samples = profile.samples();
        let end_ms = profile.duration() * 1000.0;
        let mut bounds = Vec::with_capacity(samples.len() + 1);
        let mut scores = Vec::with_capacity(samples.len());
        for sample in samples {
            bounds.push(sample.timestamp * 1000.0);
            scores.push(sample.score);
        }
        let last = bounds.last().copied().unwrap_or(0.0);
        bounds.push(end_ms.max(last + profile.window() * 1000.0));

        let mut prefix = Vec::with_capacity(bounds.len());
        prefix.push(0.0);
        for i in 0..scores.len() {
            let area = scores[i] * (bounds[i + 1] - bounds[i]);
            prefix.push(prefix[i] + area);
        }

        Self {
            bounds,
            prefix,
            scores,
        }
    }

    /// Integral of the profile from 0 to `t`
    fn at(&self, t: f64) -> f64 {
        if self.scores.is_empty() || t <= self.bounds[0] {
            return 0.0;
        }
        let i = match self
            .bounds
            .binary_search_by(|b| b.partial_cmp(&t).unwrap_or(Ordering::Less))
        {
            Ok(i) => i.min(self.scores.len()),
            Err(i) => i - 1,
        };
        if i >= self.scores.len() {
            return self.prefix[self.scores.len()];
        }
        self.prefix[i] + self.scores[i] * (t - self.bounds[i])
    }

    /// Mean score of the window [start, start + len)
    fn mean(&self, start_ms: u64, len_ms: u64) -> f64 {
        if len_ms == 0 {
            return 0.0;
        }
        let a = start_ms as f64;
        let b = (start_ms + len_ms) as f64;
        (self.at(b) - self.at(a)) / len_ms as f64
    }
}

/// Chooses non-overlapping source windows with the highest energy
pub struct SegmentSelector;

impl SegmentSelector {
    /// Map the bucket to a concrete count and the feasibility cap.
    /// Returns the count and an optional warning.
    pub fn segment_count(
        bucket: SegmentBucket,
        total_ms: u64,
        segment_ms: u64,
        source_ms: u64,
    ) -> (usize, Option<FeasibilityWarning>) {
        let feasible = source_ms / segment_ms.max(1);
        Self::capped_count(bucket, total_ms, segment_ms, feasible as usize)
    }

    fn capped_count(
        bucket: SegmentBucket,
        total_ms: u64,
        segment_ms: u64,
        feasible: usize,
    ) -> (usize, Option<FeasibilityWarning>) {
        let (min, max) = bucket.range();
        let segment_ms = segment_ms.max(1);
        let wanted = ((total_ms as f64 / segment_ms as f64).round() as usize).clamp(min, max);
        let feasible = feasible.max(1);

        if wanted <= feasible {
            return (wanted, None);
        }
        if feasible >= min {
            debug!(wanted, feasible, "Segment count capped by source length");
            return (feasible, None);
        }
        (feasible, Some(Self::shortage(wanted, feasible, min, segment_ms)))
    }

    fn shortage(requested: usize, granted: usize, min: usize, segment_ms: u64) -> FeasibilityWarning {
        FeasibilityWarning {
            requested,
            granted,
            message: format!(
                "Source is too short for {} segments of {:.1}s; using {}",
                min,
                segment_ms as f64 / 1000.0,
                granted
            ),
        }
    }

    /// Select segments whose durations sum to `total_duration`
    pub fn select(
        profile: &EnergyProfile,
        bucket: SegmentBucket,
        segment_duration: f64,
        total_duration: f64,
        source: &MediaAsset,
    ) -> MontageResult<Selection> {
        let source_ms = (source.duration * 1000.0).floor() as u64;
        let (total_ms, segment_ms) = Self::requested_ms(total_duration, segment_duration)?;
        if total_ms > source_ms {
            return Err(MontageError::plan(format!(
                "Requested duration {:.3}s exceeds source duration {:.3}s",
                total_duration, source.duration
            )));
        }

        let (k, warning) = Self::segment_count(bucket, total_ms, segment_ms, source_ms);
        if let Some(w) = &warning {
            warn!(requested = w.requested, granted = w.granted, "{}", w.message);
        }

        let durations = Self::distribute(total_ms, k);
        let (starts, placement) = Self::place_in(profile, &durations, source_ms);
        let segments = Self::segments_at(source, &starts, &durations, source_ms)?;

        info!(
            count = segments.len(),
            window_ms = durations[0],
            placement = ?placement,
            "Segments selected"
        );
        for segment in &segments {
            debug!(segment = %segment, "Selected segment");
        }

        Ok(Selection { segments, warning })
    }

    /// Select segments across several sources whose durations sum to
    /// `total_duration`. Each source receives a share of the segments
    /// proportional to its length; segments are ordered by source, then time.
    pub fn select_many(
        sources: &[SourceProfile<'_>],
        bucket: SegmentBucket,
        segment_duration: f64,
        total_duration: f64,
    ) -> MontageResult<Selection> {
        match sources {
            [] => return Err(MontageError::plan("No sources to select from")),
            [only] => return Self::select(only.profile, bucket, segment_duration, total_duration, only.asset),
            _ => {}
        }

        let lengths: Vec<u64> = sources
            .iter()
            .map(|s| (s.asset.duration * 1000.0).floor() as u64)
            .collect();
        let combined: u64 = lengths.iter().sum();
        let (total_ms, segment_ms) = Self::requested_ms(total_duration, segment_duration)?;
        if total_ms > combined {
            return Err(MontageError::plan(format!(
                "Requested duration {:.3}s exceeds combined source duration {:.3}s",
                total_duration,
                combined as f64 / 1000.0
            )));
        }

        let feasible: u64 = lengths.iter().map(|l| l / segment_ms).sum();
        let (mut k, mut warning) = Self::capped_count(bucket, total_ms, segment_ms, feasible as usize);

        // Longer windows fit fewer times per source, so shrink until every window has a home
        let (durations, counts) = loop {
            let durations = Self::distribute(total_ms, k);
            let caps: Vec<usize> = lengths.iter().map(|l| (l / durations[0]) as usize).collect();
            let capacity: usize = caps.iter().sum();
            if capacity >= k {
                let counts = Self::allocate(k, &lengths, &caps);
                break (durations, counts);
            }
            if capacity == 0 {
                return Err(MontageError::plan(format!(
                    "No source is long enough for a {:.3}s segment",
                    durations[0] as f64 / 1000.0
                )));
            }
            let requested = warning.as_ref().map(|w| w.requested).unwrap_or(k);
            k = capacity;
            if k < bucket.min() {
                warning = Some(Self::shortage(requested, k, bucket.min(), segment_ms));
            }
        };
        if let Some(w) = &warning {
            warn!(requested = w.requested, granted = w.granted, "{}", w.message);
        }

        let mut segments = Vec::with_capacity(k);
        let mut offset = 0;
        for ((source, &count), &source_ms) in sources.iter().zip(&counts).zip(&lengths) {
            if count == 0 {
                debug!(source = %source.asset.path.display(), "No segments taken from source");
                continue;
            }
            let slice = &durations[offset..offset + count];
            offset += count;
            let (starts, placement) = Self::place_in(source.profile, slice, source_ms);
            debug!(
                source = %source.asset.path.display(),
                count,
                placement = ?placement,
                "Source segments placed"
            );
            segments.extend(Self::segments_at(source.asset, &starts, slice, source_ms)?);
        }

        info!(
            count = segments.len(),
            sources = sources.len(),
            window_ms = durations[0],
            "Segments selected"
        );
        for segment in &segments {
            debug!(segment = %segment, "Selected segment");
        }

        Ok(Selection { segments, warning })
    }

    fn requested_ms(total_duration: f64, segment_duration: f64) -> MontageResult<(u64, u64)> {
        let total_ms = (total_duration * 1000.0).round() as u64;
        let segment_ms = (segment_duration * 1000.0).round() as u64;
        if total_ms == 0 || segment_ms == 0 {
            return Err(MontageError::plan("Requested durations must be positive"));
        }
        Ok((total_ms, segment_ms))
    }

    /// Largest-remainder split of `k` segments by source length, within each source's cap.
    /// The caller guarantees the caps add up to at least `k`.
    fn allocate(k: usize, lengths: &[u64], caps: &[usize]) -> Vec<usize> {
        let combined: u64 = lengths.iter().sum::<u64>().max(1);
        let k64 = k as u64;
        let mut counts: Vec<usize> = lengths
            .iter()
            .zip(caps)
            .map(|(&l, &cap)| ((k64 * l / combined) as usize).min(cap))
            .collect();
        let mut order: Vec<(usize, u64)> = lengths
            .iter()
            .enumerate()
            .map(|(i, &l)| (i, k64 * l % combined))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut assigned: usize = counts.iter().sum();
        while assigned < k {
            let before = assigned;
            for &(i, _) in &order {
                if assigned == k {
                    break;
                }
                if counts[i] < caps[i] {
                    counts[i] += 1;
                    assigned += 1;
                }
            }
            if assigned == before {
                break;
            }
        }
        counts
    }

    fn place_in(profile: &EnergyProfile, durations: &[u64], source_ms: u64) -> (Vec<u64>, Placement) {
        if profile.is_flat() {
            return (Self::uniform_starts(durations, source_ms), Placement::Uniform);
        }
        let integral = EnergyIntegral::new(profile);
        Self::place(&integral, durations.len(), durations[0], durations, source_ms)
    }

    fn segments_at(
        source: &MediaAsset,
        starts: &[u64],
        durations: &[u64],
        source_ms: u64,
    ) -> MontageResult<Vec<Segment>> {
        starts
            .iter()
            .zip(durations)
            .map(|(&start, &duration)| Segment::new(&source.path, start, duration, source_ms))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MontageError::plan(e.to_string()))
    }

    /// Split `total_ms` into `k` parts, remainder to the earliest parts
    fn distribute(total_ms: u64, k: usize) -> Vec<u64> {
        let k64 = k as u64;
        let base = total_ms / k64;
        let remainder = (total_ms % k64) as usize;
        (0..k).map(|i| base + u64::from(i < remainder)).collect()
    }

    fn candidates(window_ms: u64, source_ms: u64) -> Vec<u64> {
        let last = source_ms.saturating_sub(window_ms);
        let mut starts: Vec<u64> = (0..=last / CANDIDATE_STEP_MS).map(|i| i * CANDIDATE_STEP_MS).collect();
        if starts.last() != Some(&last) {
            starts.push(last);
        }
        starts
    }

    fn place(
        integral: &EnergyIntegral,
        k: usize,
        window_ms: u64,
        durations: &[u64],
        source_ms: u64,
    ) -> (Vec<u64>, Placement) {
        let mut ranked: Vec<(u64, f64)> = Self::candidates(window_ms, source_ms)
            .into_iter()
            .map(|start| (start, integral.mean(start, window_ms)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        if let Some(starts) = Self::greedy(&ranked, k, window_ms + MIN_GAP_MS) {
            return (starts, Placement::GreedyWithGap);
        }
        if let Some(starts) = Self::greedy(&ranked, k, window_ms) {
            return (starts, Placement::Greedy);
        }
        if let Some(starts) = Self::best_per_slot(integral, durations, source_ms) {
            return (starts, Placement::PerSlot);
        }
        (Self::uniform_starts(durations, source_ms), Placement::Uniform)
    }

    /// Take the best candidates whose starts are at least `separation` apart
    fn greedy(ranked: &[(u64, f64)], k: usize, separation: u64) -> Option<Vec<u64>> {
        let mut chosen: Vec<u64> = Vec::with_capacity(k);
        for &(start, _) in ranked {
            if chosen.iter().all(|&c| c.abs_diff(start) >= separation) {
                chosen.push(start);
                if chosen.len() == k {
                    chosen.sort_unstable();
                    return Some(chosen);
                }
            }
        }
        None
    }

    /// Best window inside each of `k` equal slots of the source
    fn best_per_slot(integral: &EnergyIntegral, durations: &[u64], source_ms: u64) -> Option<Vec<u64>> {
        let k = durations.len() as u64;
        let mut starts = Vec::with_capacity(durations.len());
        for (i, &duration) in durations.iter().enumerate() {
            let slot_start = source_ms * i as u64 / k;
            let slot_end = source_ms * (i as u64 + 1) / k;
            if slot_end < slot_start + duration {
                return None;
            }
            let last = slot_end - duration;
            let mut best = (slot_start, f64::MIN);
            let mut start = slot_start;
            loop {
                let score = integral.mean(start, duration);
                if score > best.1 {
                    best = (start, score);
                }
                if start == last {
                    break;
                }
                start = (start + CANDIDATE_STEP_MS).min(last);
            }
            starts.push(best.0);
        }
        Some(starts)
    }

    /// Spread segments evenly, with equal gaps before, between and after them
    fn uniform_starts(durations: &[u64], source_ms: u64) -> Vec<u64> {
        let used: u64 = durations.iter().sum();
        let slack = source_ms.saturating_sub(used);
        let gaps = durations.len() as u64 + 1;
        let mut cursor = 0;
        let mut starts = Vec::with_capacity(durations.len());
        for (i, &duration) in durations.iter().enumerate() {
            cursor += slack * (i as u64 + 1) / gaps - slack * i as u64 / gaps;
            starts.push(cursor);
            cursor += duration;
        }
        starts
    }
}
