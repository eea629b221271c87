//! Small closed vocabularies stored as strings

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("Invalid priority '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorStatus {
    Researching,
    Contacted,
    Booked,
    Declined,
}

impl VendorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorStatus::Researching => "researching",
            VendorStatus::Contacted => "contacted",
            VendorStatus::Booked => "booked",
            VendorStatus::Declined => "declined",
        }
    }
}

impl FromStr for VendorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "researching" => Ok(VendorStatus::Researching),
            "contacted" => Ok(VendorStatus::Contacted),
            "booked" => Ok(VendorStatus::Booked),
            "declined" => Ok(VendorStatus::Declined),
            other => Err(format!("Invalid vendor status '{}'", other)),
        }
    }
}

/// Which partner's side a guest was invited from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestSide {
    PartnerOne,
    PartnerTwo,
    Both,
}

impl GuestSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestSide::PartnerOne => "partner_one",
            GuestSide::PartnerTwo => "partner_two",
            GuestSide::Both => "both",
        }
    }
}

impl FromStr for GuestSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partner_one" => Ok(GuestSide::PartnerOne),
            "partner_two" => Ok(GuestSide::PartnerTwo),
            "both" => Ok(GuestSide::Both),
            other => Err(format!("Invalid side '{}'", other)),
        }
    }
}
