use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_TABLE_CAPACITY: i32 = 50;

/// Who in a guest's party an assignment seats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeType {
    Guest,
    PlusOne,
    Child,
}

impl AttendeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeeType::Guest => "guest",
            AttendeeType::PlusOne => "plus_one",
            AttendeeType::Child => "child",
        }
    }
}

impl fmt::Display for AttendeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendeeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(AttendeeType::Guest),
            "plus_one" => Ok(AttendeeType::PlusOne),
            "child" => Ok(AttendeeType::Child),
            other => Err(format!("Invalid attendee type '{}'", other)),
        }
    }
}

/// Reject a new occupant when the table is already full
pub fn check_capacity(table_name: &str, capacity: i32, seats_taken: u64) -> Result<(), String> {
    if seats_taken >= capacity.max(0) as u64 {
        return Err(format!(
            "Table '{}' is at capacity ({} of {} seats taken)",
            table_name, seats_taken, capacity
        ));
    }
    Ok(())
}

pub fn check_seat_number(table_name: &str, capacity: i32, seat_number: i32) -> Result<(), String> {
    if seat_number < 1 || seat_number > capacity {
        return Err(format!(
            "Seat {} does not exist at table '{}' (seats 1-{})",
            seat_number, table_name, capacity
        ));
    }
    Ok(())
}

pub fn check_table_capacity(capacity: i32) -> Result<(), String> {
    if !(1..=MAX_TABLE_CAPACITY).contains(&capacity) {
        return Err(format!(
            "Capacity must be between 1 and {}",
            MAX_TABLE_CAPACITY
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_table_is_rejected_with_its_name() {
        let err = check_capacity("Head Table", 2, 2).unwrap_err();
        assert!(err.contains("Head Table"));
        assert!(check_capacity("Head Table", 2, 1).is_ok());
    }

    #[test]
    fn seat_numbers_are_bounded_by_capacity() {
        assert!(check_seat_number("T1", 8, 1).is_ok());
        assert!(check_seat_number("T1", 8, 8).is_ok());
        assert!(check_seat_number("T1", 8, 9).is_err());
        assert!(check_seat_number("T1", 8, 0).is_err());
    }

    #[test]
    fn table_capacity_limits() {
        assert!(check_table_capacity(0).is_err());
        assert!(check_table_capacity(10).is_ok());
        assert!(check_table_capacity(MAX_TABLE_CAPACITY + 1).is_err());
    }

    #[test]
    fn attendee_types_parse() {
        assert_eq!("plus_one".parse::<AttendeeType>(), Ok(AttendeeType::PlusOne));
        assert!("spouse".parse::<AttendeeType>().is_err());
    }
}
