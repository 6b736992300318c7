//! Deterministic match "prediction" shown next to each fixture.
//!
//! This is a placeholder for a real model: a pure function of the two team
//! names with no statistical meaning. Callers rely only on it being stable,
//! i.e. the same pair of names always yields the same triple.

use serde::Serialize;

/// Lower bound of the draw share, in percent.
const DRAW_BASE: f64 = 20.0;
/// Width of the band the draw share varies in.
const DRAW_SPREAD: u64 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub home_win_pct: f64,
    pub draw_pct: f64,
    pub away_win_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    HomeWin,
    Draw,
    AwayWin,
}

impl Prediction {
    /// Most likely outcome; ties go to `Draw`.
    pub fn verdict(&self) -> Verdict {
        if self.home_win_pct > self.away_win_pct && self.home_win_pct > self.draw_pct {
            Verdict::HomeWin
        } else if self.away_win_pct > self.home_win_pct && self.away_win_pct > self.draw_pct {
            Verdict::AwayWin
        } else {
            Verdict::Draw
        }
    }

    /// Share of the most likely outcome.
    pub fn confidence(&self) -> f64 {
        self.home_win_pct.max(self.draw_pct).max(self.away_win_pct)
    }
}

fn weight(name: &str) -> u64 {
    name.trim().chars().map(|c| u64::from(u32::from(c))).sum()
}

/// Split 100% between home win, draw and away win from the two names.
///
/// Each side's share of the non-draw mass is proportional to the sum of its
/// name's code points. The draw share sits in `[20, 30]`.
pub fn predict(home_team: &str, away_team: &str) -> Prediction {
    let h = weight(home_team);
    let a = weight(away_team);

    let draw = DRAW_BASE + ((h ^ a) % DRAW_SPREAD) as f64;
    let decisive = 100.0 - draw;
    let home = if h + a == 0 {
        decisive / 2.0
    } else {
        decisive * h as f64 / (h + a) as f64
    };

    Prediction {
        home_win_pct: home,
        draw_pct: draw,
        away_win_pct: decisive - home,
    }
}
