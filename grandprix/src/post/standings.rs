use crate::post::race_result::RaceClassification;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverStanding {
    pub position: u32,
    pub driver_id: u32,
    pub name: String,
    pub team_id: u32,
    pub points: u32,
    pub wins: u32,
    pub podiums: u32,
    pub fastest_laps: u32,
    pub dnfs: u32,
    pub races: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStanding {
    pub position: u32,
    pub team_id: u32,
    pub points: u32,
    pub wins: u32,
    pub podiums: u32,
}

/// calc_driver_standings sums up the classifications of all races of a season. Ties on points are
/// broken by the number of wins, then podiums.
pub fn calc_driver_standings<'a, I>(races: I) -> Vec<DriverStanding>
where
    I: IntoIterator<Item = &'a [RaceClassification]>,
{
    let mut standings: HashMap<u32, DriverStanding> = HashMap::new();

    for classification in races {
        for row in classification.iter() {
            let entry = standings
                .entry(row.driver_id)
                .or_insert_with(|| DriverStanding {
                    position: 0,
                    driver_id: row.driver_id,
                    name: row.name.to_owned(),
                    team_id: row.team_id,
                    points: 0,
                    wins: 0,
                    podiums: 0,
                    fastest_laps: 0,
                    dnfs: 0,
                    races: 0,
                });

            // drivers may change teams during a season, the latest team counts
            entry.team_id = row.team_id;
            entry.points += row.points;
            entry.races += 1;
            if row.dnf {
                entry.dnfs += 1;
            } else {
                if row.position == 1 {
                    entry.wins += 1;
                }
                if row.position <= 3 {
                    entry.podiums += 1;
                }
            }
            if row.fastest_lap {
                entry.fastest_laps += 1;
            }
        }
    }

    let mut standings: Vec<DriverStanding> = standings.into_values().collect();
    standings.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then(b.podiums.cmp(&a.podiums))
            .then(a.driver_id.cmp(&b.driver_id))
    });
    for (pos, standing) in standings.iter_mut().enumerate() {
        standing.position = pos as u32 + 1;
    }

    standings
}

/// calc_team_standings sums up the points of both drivers of every team.
pub fn calc_team_standings<'a, I>(races: I) -> Vec<TeamStanding>
where
    I: IntoIterator<Item = &'a [RaceClassification]>,
{
    let mut standings: HashMap<u32, TeamStanding> = HashMap::new();

    for classification in races {
        for row in classification.iter() {
            let entry = standings.entry(row.team_id).or_insert(TeamStanding {
                position: 0,
                team_id: row.team_id,
                points: 0,
                wins: 0,
                podiums: 0,
            });

            entry.points += row.points;
            if !row.dnf && row.position == 1 {
                entry.wins += 1;
            }
            if !row.dnf && row.position <= 3 {
                entry.podiums += 1;
            }
        }
    }

    let mut standings: Vec<TeamStanding> = standings.into_values().collect();
    standings.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then(b.podiums.cmp(&a.podiums))
            .then(a.team_id.cmp(&b.team_id))
    });
    for (pos, standing) in standings.iter_mut().enumerate() {
        standing.position = pos as u32 + 1;
    }

    standings
}
