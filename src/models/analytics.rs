// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Risk aggregates for the admin dashboard.
//!
//! Computed on request from the `users` collection; admins are never counted.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{RiskLevel, UserProfile};
use crate::time_utils::parse_calendar_date;

/// Risk counts plus a per-user trend series.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalytics {
    pub total_users: u32,
    pub high_risk: u32,
    pub medium_risk: u32,
    pub low_risk: u32,
    pub trend: Vec<TrendPoint>,
}

/// One point on the risk trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrendPoint {
    /// `YYYY-MM-DD` of the user's last update
    pub date: String,
    /// 3 = high, 2 = medium, 1 = anything else
    pub level: u8,
}

/// Row of the admin user table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub pregnancy_status: Option<String>,
    pub last_updated: Option<String>,
}

impl RiskAnalytics {
    /// Aggregate over `(uid, profile)` pairs, skipping admins.
    pub fn from_users<'a, I>(users: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a UserProfile)>,
    {
        let mut analytics = Self::default();

        for (_, profile) in users.into_iter().filter(|(_, p)| !p.is_admin()) {
            analytics.total_users += 1;
            match profile.risk_level {
                Some(RiskLevel::High) => analytics.high_risk += 1,
                Some(RiskLevel::Medium) => analytics.medium_risk += 1,
                Some(RiskLevel::Low) => analytics.low_risk += 1,
                None => {}
            }

            // Users never analyzed have no date to plot
            if let Some(date) = profile
                .last_updated
                .as_deref()
                .and_then(parse_calendar_date)
            {
                analytics.trend.push(TrendPoint {
                    date: date.format("%Y-%m-%d").to_string(),
                    level: RiskLevel::trend_score(profile.risk_level),
                });
            }
        }

        analytics
            .trend
            .sort_by(|a, b| a.date.cmp(&b.date).then(a.level.cmp(&b.level)));
        analytics
    }
}

impl UserSummary {
    pub fn new(id: &str, profile: &UserProfile) -> Self {
        Self {
            id: id.to_string(),
            email: profile.email.clone(),
            risk_level: profile.risk_level,
            pregnancy_status: profile.pregnancy_status.clone(),
            last_updated: profile.last_updated.clone(),
        }
    }

    /// Table rows for every non-admin user.
    pub fn list<'a, I>(users: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a UserProfile)>,
    {
        users
            .into_iter()
            .filter(|(_, p)| !p.is_admin())
            .map(|(id, p)| Self::new(id, p))
            .collect()
    }
}
