/// Points for positions 1 to 10.
pub const POINTS_TABLE: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];

/// Bonus for the fastest lap, only awarded to a finisher within the points.
pub const FASTEST_LAP_BONUS: u32 = 1;

/// Upper bound of the points awarded in a single race: the whole table plus one bonus.
pub const MAX_POINTS_PER_RACE: u32 = table_sum() + FASTEST_LAP_BONUS;

const fn table_sum() -> u32 {
    let mut sum = 0;
    let mut i = 0;
    while i < POINTS_TABLE.len() {
        sum += POINTS_TABLE[i];
        i += 1;
    }
    sum
}

/// points_for_position returns the points of a finishing position (1-based).
pub fn points_for_position(position: u32) -> u32 {
    match position {
        1..=10 => POINTS_TABLE[position as usize - 1],
        _ => 0,
    }
}

/// race_points returns the points of a classified car. Retired cars never score.
pub fn race_points(position: u32, dnf: bool, fastest_lap: bool) -> u32 {
    if dnf {
        return 0;
    }

    let bonus = if fastest_lap && position <= POINTS_TABLE.len() as u32 {
        FASTEST_LAP_BONUS
    } else {
        0
    };

    points_for_position(position) + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_top_ten() {
        assert_eq!(points_for_position(1), 25);
        assert_eq!(points_for_position(10), 1);
        assert_eq!(points_for_position(11), 0);
        assert_eq!(points_for_position(0), 0);
        assert_eq!(
            POINTS_TABLE.iter().sum::<u32>() + FASTEST_LAP_BONUS,
            MAX_POINTS_PER_RACE
        );
        assert_eq!(MAX_POINTS_PER_RACE, 102);
    }

    #[test]
    fn retired_cars_score_nothing() {
        assert_eq!(race_points(1, true, true), 0);
        assert_eq!(race_points(3, false, true), 16);
        assert_eq!(race_points(12, false, true), 0);
    }
}
