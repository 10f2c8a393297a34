//! HTTP API response documents

use crate::domain::*;
use chrono::{DateTime, Utc};
use serde::Deserialize;

fn timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Deserialize)]
struct OutcomeDescriptionXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpecifierDescriptionXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@type", default)]
    kind: String,
}

#[derive(Debug, Deserialize, Default)]
struct OutcomeDescriptionsXml {
    #[serde(rename = "outcome", default)]
    outcomes: Vec<OutcomeDescriptionXml>,
}

#[derive(Debug, Deserialize, Default)]
struct SpecifierDescriptionsXml {
    #[serde(rename = "specifier", default)]
    specifiers: Vec<SpecifierDescriptionXml>,
}

#[derive(Debug, Deserialize)]
struct MarketDescriptionXml {
    #[serde(rename = "@id")]
    id: u64,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@groups", default)]
    groups: String,
    #[serde(rename = "@variant", default)]
    variant: Option<String>,
    #[serde(default)]
    outcomes: OutcomeDescriptionsXml,
    #[serde(default)]
    specifiers: SpecifierDescriptionsXml,
}

impl From<MarketDescriptionXml> for MarketDescription {
    fn from(x: MarketDescriptionXml) -> Self {
        MarketDescription {
            id: x.id,
            name: x.name,
            groups: x
                .groups
                .split('|')
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect(),
            variant: x.variant,
            outcomes: x
                .outcomes
                .outcomes
                .into_iter()
                .map(|o| OutcomeDescription { id: o.id, name: o.name })
                .collect(),
            specifiers: x
                .specifiers
                .specifiers
                .into_iter()
                .map(|s| SpecifierDescription { name: s.name, kind: s.kind })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarketDescriptionsXml {
    #[serde(rename = "market", default)]
    markets: Vec<MarketDescriptionXml>,
}

impl MarketDescriptionsXml {
    pub(crate) fn into_markets(self) -> Vec<MarketDescription> {
        self.markets.into_iter().map(MarketDescription::from).collect()
    }
}

#[derive(Debug, Deserialize)]
struct TournamentXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CompetitorRefXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@abbreviation", default)]
    abbreviation: Option<String>,
    #[serde(rename = "@qualifier", default)]
    qualifier: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CompetitorsXml {
    #[serde(rename = "competitor", default)]
    competitors: Vec<CompetitorRefXml>,
}

/// `<fixture>` of a fixture document or `<sport_event>` of a schedule
#[derive(Debug, Deserialize)]
pub(crate) struct SportEventXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@scheduled", default)]
    scheduled: Option<String>,
    #[serde(rename = "@start_time", default)]
    start_time: Option<String>,
    #[serde(rename = "@status", default)]
    status: Option<String>,
    #[serde(default)]
    tournament: Option<TournamentXml>,
    #[serde(default)]
    competitors: CompetitorsXml,
}

impl From<SportEventXml> for Fixture {
    fn from(x: SportEventXml) -> Self {
        Fixture {
            urn: Urn::from_raw(x.id),
            name: x.name,
            scheduled: timestamp(x.scheduled),
            start_time: timestamp(x.start_time),
            status: x.status,
            tournament: x.tournament.map(|t| Tournament {
                urn: Urn::from_raw(t.id),
                name: t.name,
            }),
            competitors: x
                .competitors
                .competitors
                .into_iter()
                .map(|c| FixtureCompetitor {
                    id: Urn::from_raw(c.id).id(),
                    name: c.name,
                    abbreviation: c.abbreviation,
                    qualifier: c.qualifier,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixtureDocumentXml {
    pub(crate) fixture: SportEventXml,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleXml {
    #[serde(rename = "sport_event", default)]
    pub(crate) events: Vec<SportEventXml>,
}

#[derive(Debug, Deserialize)]
struct PlayerXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@full_name", default)]
    full_name: String,
    #[serde(rename = "@nationality", default)]
    nationality: Option<String>,
    #[serde(rename = "@type", default)]
    player_type: Option<String>,
    #[serde(rename = "@date_of_birth", default)]
    date_of_birth: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerProfileXml {
    player: PlayerXml,
}

impl From<PlayerProfileXml> for Player {
    fn from(x: PlayerProfileXml) -> Self {
        let p = x.player;
        Player {
            id: Urn::from_raw(p.id).id(),
            name: p.name,
            full_name: p.full_name,
            nationality: p.nationality,
            player_type: p.player_type,
            date_of_birth: p.date_of_birth,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompetitorXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@abbreviation", default)]
    abbreviation: Option<String>,
    #[serde(rename = "@country", default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompetitorPlayerXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct CompetitorPlayersXml {
    #[serde(rename = "player", default)]
    players: Vec<CompetitorPlayerXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompetitorProfileXml {
    competitor: CompetitorXml,
    #[serde(default)]
    players: CompetitorPlayersXml,
}

impl From<CompetitorProfileXml> for Competitor {
    fn from(x: CompetitorProfileXml) -> Self {
        Competitor {
            id: Urn::from_raw(x.competitor.id).id(),
            name: x.competitor.name,
            abbreviation: x.competitor.abbreviation,
            country: x.competitor.country,
            players: x
                .players
                .players
                .into_iter()
                .map(|p| CompetitorPlayer {
                    id: Urn::from_raw(p.id).id(),
                    name: p.name,
                })
                .collect(),
        }
    }
}
