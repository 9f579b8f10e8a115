//! Site-wide analytics for admins and supervisors.

use super::responses::respondent_name;
use crate::app_config::LimitsConfig;
use crate::orm::questions::QuestionType;
use crate::orm::{questions, responses, surveys};
use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use sea_orm::{entity::*, ConnectionTrait, DbErr};
use std::collections::{HashMap, HashSet};

/// Title length above which the top surveys table shortens titles.
const TITLE_MAX: usize = 25;
const TITLE_KEEP: usize = 22;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Unknown values fall back to monthly.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "weekly" => Period::Weekly,
            "yearly" => Period::Yearly,
            _ => Period::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Weekly => "Last 7 days",
            Period::Monthly => "Last 30 days",
            Period::Yearly => "Last 12 months",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Monthly
    }
}

/// One bucket of the response trend chart, `[start, end)`.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendPoint {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: String,
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn day_point(day: NaiveDate) -> TrendPoint {
    TrendPoint {
        start: midnight(day),
        end: midnight(day + Duration::days(1)),
        label: day.format("%d %b").to_string(),
    }
}

/// Weekly: 7 days from a week ago. Monthly: 10 single days, 3 days apart,
/// from 30 days ago. Yearly: 12 months from a year ago.
pub fn trend_points(period: Period, today: NaiveDate) -> Vec<TrendPoint> {
    match period {
        Period::Weekly => {
            let start = today - Duration::days(7);
            (0..7).map(|i| day_point(start + Duration::days(i))).collect()
        }
        Period::Monthly => {
            let start = today - Duration::days(30);
            (0..10).map(|i| day_point(start + Duration::days(i * 3))).collect()
        }
        Period::Yearly => {
            let start = today.checked_sub_months(Months::new(12)).unwrap_or(today);
            (0..12)
                .filter_map(|i| {
                    let month = start.checked_add_months(Months::new(i))?;
                    let next = month.checked_add_months(Months::new(1))?;
                    Some(TrendPoint {
                        start: midnight(month),
                        end: midnight(next),
                        label: month.format("%b %y").to_string(),
                    })
                })
                .collect()
        }
    }
}

/// Cuts long titles to 22 characters plus an ellipsis.
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_MAX {
        let kept: String = title.chars().take(TITLE_KEEP).collect();
        format!("{}...", kept)
    } else {
        title.to_owned()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopSurvey {
    pub survey_id: i32,
    pub title: String,
    pub short_title: String,
    pub response_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecentActivity {
    pub survey_title: String,
    pub activity_type: String,
    pub timestamp: NaiveDateTime,
    pub username: String,
    pub action_link: String,
}

impl RecentActivity {
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M").to_string()
    }
}

#[derive(Clone, Debug)]
pub struct Dashboard {
    pub period: Period,
    pub total_surveys: usize,
    pub total_responses: usize,
    pub active_surveys: usize,
    /// Mean responses per survey, one decimal.
    pub avg_responses: f64,
    pub trend_labels: Vec<String>,
    pub trend_data: Vec<usize>,
    pub top_surveys: Vec<TopSurvey>,
    /// `(type label, question count)` in a fixed order.
    pub distribution: Vec<(String, usize)>,
    pub recent: Vec<RecentActivity>,
}

impl Dashboard {
    pub fn avg_responses_label(&self) -> String {
        format!("{:.1}", self.avg_responses)
    }

    /// Chart input for the dashboard script.
    pub fn charts_json(&self) -> String {
        serde_json::json!({
            "trend": { "labels": self.trend_labels, "data": self.trend_data },
            "topSurveys": {
                "labels": self.top_surveys.iter().map(|t| t.short_title.as_str()).collect::<Vec<_>>(),
                "data": self.top_surveys.iter().map(|t| t.response_count).collect::<Vec<_>>(),
            },
            "distribution": {
                "labels": self.distribution.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>(),
                "data": self.distribution.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
            },
        })
        .to_string()
    }
}

/// Inputs of the dashboard, loaded in one go.
pub struct DashboardRows<'a> {
    pub surveys: &'a [surveys::Model],
    pub responses: &'a [responses::Model],
    pub question_types: &'a [QuestionType],
    pub names: &'a HashMap<i32, String>,
}

pub fn build(
    rows: DashboardRows<'_>,
    period: Period,
    now: NaiveDateTime,
    limits: &LimitsConfig,
) -> Dashboard {
    let today = now.date();
    let today_start = midnight(today);

    let active_surveys = rows
        .surveys
        .iter()
        .filter(|s| s.is_active && s.end_date.map(|end| end >= today_start).unwrap_or(true))
        .count();

    let avg_responses = if rows.surveys.is_empty() {
        0.0
    } else {
        let avg = rows.responses.len() as f64 / rows.surveys.len() as f64;
        (avg * 10.0).round() / 10.0
    };

    let points = trend_points(period, today);
    let trend_data = points
        .iter()
        .map(|p| {
            rows.responses
                .iter()
                .filter(|r| r.submitted_at >= p.start && r.submitted_at < p.end)
                .count()
        })
        .collect();
    let trend_labels = points.into_iter().map(|p| p.label).collect();

    let mut counts: HashMap<i32, usize> = HashMap::new();
    for response in rows.responses {
        *counts.entry(response.survey_id).or_default() += 1;
    }
    let mut ranked: Vec<&surveys::Model> = rows.surveys.iter().collect();
    ranked.sort_by(|a, b| {
        let ca = counts.get(&a.id).copied().unwrap_or(0);
        let cb = counts.get(&b.id).copied().unwrap_or(0);
        cb.cmp(&ca).then(a.id.cmp(&b.id))
    });
    let top_surveys = ranked
        .into_iter()
        .take(limits.top_surveys as usize)
        .map(|s| TopSurvey {
            survey_id: s.id,
            title: s.title.clone(),
            short_title: truncate_title(&s.title),
            response_count: counts.get(&s.id).copied().unwrap_or(0),
        })
        .collect();

    let distribution = QuestionType::ALL
        .iter()
        .map(|kind| {
            (
                kind.label().to_owned(),
                rows.question_types.iter().filter(|t| *t == kind).count(),
            )
        })
        .collect();

    let titles: HashMap<i32, &str> = rows
        .surveys
        .iter()
        .map(|s| (s.id, s.title.as_str()))
        .collect();
    let mut newest: Vec<&responses::Model> = rows.responses.iter().collect();
    newest.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
    let recent = newest
        .into_iter()
        .take(limits.recent_activity as usize)
        .map(|r| RecentActivity {
            survey_title: titles.get(&r.survey_id).copied().unwrap_or_default().to_owned(),
            activity_type: "Survey Response".to_owned(),
            timestamp: r.submitted_at,
            username: respondent_name(r, rows.names),
            action_link: format!("/surveys/{}/results", r.survey_id),
        })
        .collect();

    Dashboard {
        period,
        total_surveys: rows.surveys.len(),
        total_responses: rows.responses.len(),
        active_surveys,
        avg_responses,
        trend_labels,
        trend_data,
        top_surveys,
        distribution,
        recent,
    }
}

pub async fn load_dashboard<C: ConnectionTrait>(
    db: &C,
    period: Period,
    now: NaiveDateTime,
    limits: &LimitsConfig,
) -> Result<Dashboard, DbErr> {
    let survey_rows = surveys::Entity::find().all(db).await?;
    let response_rows = responses::Entity::find().all(db).await?;
    let question_types: Vec<QuestionType> = questions::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|q| q.question_type)
        .collect();

    let user_ids: Vec<i32> = response_rows
        .iter()
        .filter(|r| !r.is_anonymous)
        .filter_map(|r| r.respondent_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let names = crate::user::names_by_id(db, user_ids).await?;

    Ok(build(
        DashboardRows {
            surveys: &survey_rows,
            responses: &response_rows,
            question_types: &question_types,
            names: &names,
        },
        period,
        now,
        limits,
    ))
}
