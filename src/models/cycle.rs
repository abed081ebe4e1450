// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Menstrual cycle phase lookup and the blood-sugar adjustment derived from it.

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::UserProfile;
use crate::time_utils::parse_calendar_date;

/// Phase of the menstrual cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl CyclePhase {
    /// Offset (mmol/L) applied to the blood-sugar baseline in this phase.
    pub fn blood_sugar_offset(&self) -> f64 {
        match self {
            CyclePhase::Menstrual => -0.5,
            CyclePhase::Follicular => -1.0,
            CyclePhase::Ovulation => 0.0,
            CyclePhase::Luteal => 2.0,
        }
    }
}

/// Phase for `today` given the first day of the last period.
///
/// Returns `None` when there is nothing sensible to compute: no cycle length,
/// or a last period date in the future.
pub fn cycle_phase(last_period: NaiveDate, cycle_length: u32, today: NaiveDate) -> Option<CyclePhase> {
    if cycle_length == 0 {
        return None;
    }

    let elapsed = (today - last_period).num_days();
    if elapsed < 0 {
        return None;
    }

    let cycle_day = elapsed % i64::from(cycle_length);
    let phase = match cycle_day {
        0..=5 => CyclePhase::Menstrual,
        6..=14 => CyclePhase::Follicular,
        15..=17 => CyclePhase::Ovulation,
        _ => CyclePhase::Luteal,
    };
    Some(phase)
}

/// Phase for a stored profile, if its last period date parses.
pub fn profile_phase(profile: &UserProfile, today: NaiveDate) -> Option<CyclePhase> {
    let last_period = profile
        .last_period_date
        .as_deref()
        .and_then(parse_calendar_date)?;
    cycle_phase(last_period, profile.cycle_length, today)
}

/// Blood-sugar feature for the risk model: the user's baseline shifted by the
/// current cycle phase (no shift when the phase is unknown).
pub fn adjusted_blood_sugar(profile: &UserProfile, today: NaiveDate) -> f64 {
    let offset = profile_phase(profile, today)
        .map(|p| p.blood_sugar_offset())
        .unwrap_or(0.0);
    profile.bs_baseline + offset
}
