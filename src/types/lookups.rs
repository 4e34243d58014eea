//! Display tables for enumerated packet fields
//!
//! Codes outside a table decode to the `Unknown(code)` variant, whose label
//! is [`UNKNOWN_LABEL`]. Nothing here fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label shared by every out-of-range code.
pub const UNKNOWN_LABEL: &str = "Unknown";

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident($code:ty) {
            $($value:literal => $variant:ident : $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant,)+
            Unknown($code),
        }

        impl $name {
            pub fn from_code(code: $code) -> Self {
                match code {
                    $($value => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }

            pub fn code(self) -> $code {
                match self {
                    $($name::$variant => $value,)+
                    $name::Unknown(code) => code,
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown(_) => UNKNOWN_LABEL,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.label() == *other
            }
        }
    };
}

code_table! {
    /// Session packet `weather`.
    Weather(u8) {
        0 => Clear: "Clear",
        1 => LightCloud: "Light Cloud",
        2 => Overcast: "Overcast",
        3 => LightRain: "Light Rain",
        4 => HeavyRain: "Heavy Rain",
        5 => Storm: "Storm",
    }
}

code_table! {
    /// Session packet `sessionType`.
    SessionType(u8) {
        0 => NotSet: "Unknown",
        1 => Practice1: "Practice 1",
        2 => Practice2: "Practice 2",
        3 => Practice3: "Practice 3",
        4 => ShortPractice: "Short Practice",
        5 => Qualifying1: "Qualifying 1",
        6 => Qualifying2: "Qualifying 2",
        7 => Qualifying3: "Qualifying 3",
        8 => ShortQualifying: "Short Qualifying",
        9 => OneShotQualifying: "One-Shot Qualifying",
        10 => SprintShootout1: "Sprint Shootout 1",
        11 => SprintShootout2: "Sprint Shootout 2",
        12 => SprintShootout3: "Sprint Shootout 3",
        13 => ShortSprintShootout: "Short Sprint Shootout",
        14 => OneShotSprintShootout: "One-Shot Sprint Shootout",
        15 => Race: "Race",
        16 => Race2: "Race 2",
        17 => Race3: "Race 3",
        18 => TimeTrial: "Time Trial",
    }
}

code_table! {
    /// Car Status `actualTyreCompound`.
    TyreCompound(u8) {
        7 => Intermediate: "Intermediate",
        8 => Wet: "Wet",
        9 => ClassicDry: "Dry",
        10 => ClassicWet: "Wet (Classic)",
        11 => F2SuperSoft: "Super Soft",
        12 => F2Soft: "Soft",
        13 => F2Medium: "Medium",
        14 => F2Hard: "Hard",
        15 => F2Wet: "Wet (F2)",
        16 => C5: "C5",
        17 => C4: "C4",
        18 => C3: "C3",
        19 => C2: "C2",
        20 => C1: "C1",
        21 => C0: "C0",
        22 => C6: "C6",
    }
}

code_table! {
    /// Lap Data `pitStatus`.
    PitStatus(u8) {
        0 => None: "None",
        1 => Pitting: "Pitting",
        2 => InPitArea: "In Pit Area",
    }
}

code_table! {
    /// Lap Data `driverStatus`.
    DriverStatus(u8) {
        0 => InGarage: "In Garage",
        1 => FlyingLap: "Flying Lap",
        2 => InLap: "In Lap",
        3 => OutLap: "Out Lap",
        4 => OnTrack: "On Track",
    }
}

code_table! {
    /// Car Status `ersDeployMode`.
    ErsMode(u8) {
        0 => None: "None",
        1 => Medium: "Medium",
        2 => Hotlap: "Hotlap",
        3 => Overtake: "Overtake",
    }
}

code_table! {
    /// Car Status `vehicleFiaFlags`; the game sends -1 when it has no value.
    FlagState(i8) {
        0 => None: "None",
        1 => Green: "Green",
        2 => Blue: "Blue",
        3 => Yellow: "Yellow",
    }
}

/// Maps `trackId` to a circuit name. Unknown ids (including -1) return
/// [`UNKNOWN_LABEL`].
pub fn track_name(track_id: i8) -> &'static str {
    const NAMES: &[&str] = &[
        "Melbourne",
        "Paul Ricard",
        "Shanghai",
        "Sakhir (Bahrain)",
        "Catalunya",
        "Monaco",
        "Montreal",
        "Silverstone",
        "Hockenheim",
        "Hungaroring",
        "Spa",
        "Monza",
        "Singapore",
        "Suzuka",
        "Abu Dhabi",
        "Texas",
        "Brazil",
        "Austria",
        "Sochi",
        "Mexico",
        "Baku (Azerbaijan)",
        "Sakhir Short",
        "Silverstone Short",
        "Texas Short",
        "Suzuka Short",
        "Hanoi",
        "Zandvoort",
        "Imola",
        "Portimao",
        "Jeddah",
        "Miami",
        "Las Vegas",
        "Losail",
    ];
    usize::try_from(track_id).ok().and_then(|idx| NAMES.get(idx)).copied().unwrap_or(UNKNOWN_LABEL)
}
