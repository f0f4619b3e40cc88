// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Team id stored on a person who has not joined a team yet
pub const NO_TEAM: i64 = -1;

/// Team point before the start code has been bound
pub const POINT_UNASSIGNED: i8 = -1;

/// Declares a fieldless enum whose wire format is its numeric code.
macro_rules! numeric_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code,)+
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(format!("invalid {} code {}", stringify!($name), other)),
                }
            }
        }
    };
}

numeric_enum! {
    /// Per-person progress along the walk
    pub enum WalkStatus {
        NotStarted = 1,
        /// Confirmed at the last check-in
        InProgress = 2,
        /// Marked present by an admin, waiting for the next check-in
        Unconfirmed = 3,
        Withdrawn = 4,
        Finished = 5,
    }
}

impl WalkStatus {
    /// Members that still count towards a team's progress
    pub fn is_active(self) -> bool {
        matches!(self, WalkStatus::InProgress | WalkStatus::Unconfirmed)
    }
}

numeric_enum! {
    /// Team-level progress
    pub enum TeamStatus {
        NotStarted = 1,
        InProgress = 2,
        FinishedUnconfirmed = 3,
        FinishedConfirmed = 4,
        /// Scan code bound at the start point
        StartCheckedIn = 5,
    }
}

impl TeamStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TeamStatus::FinishedUnconfirmed | TeamStatus::FinishedConfirmed
        )
    }

    /// Teams whose active members are counted at their current waypoint
    pub fn is_walking(self) -> bool {
        matches!(self, TeamStatus::InProgress | TeamStatus::StartCheckedIn)
    }
}

numeric_enum! {
    /// A person's role inside their team
    pub enum TeamRole {
        Unassigned = 0,
        Member = 1,
        Captain = 2,
    }
}

numeric_enum! {
    pub enum PersonType {
        Student = 1,
        Teacher = 2,
        Alumnus = 3,
    }
}

numeric_enum! {
    /// One of the five hiking courses
    pub enum Route {
        Zh = 1,
        PfHalf = 2,
        PfAll = 3,
        MgsHalf = 4,
        MgsAll = 5,
    }
}

/// Routes sharing an admin scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Campus {
    Zhaohui,
    Pingfeng,
    Moganshan,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Zh,
        Route::PfHalf,
        Route::PfAll,
        Route::MgsHalf,
        Route::MgsAll,
    ];

    /// Key used by the dashboard payloads
    pub fn key(self) -> &'static str {
        match self {
            Route::Zh => "zh",
            Route::PfHalf => "pfHalf",
            Route::PfAll => "pfAll",
            Route::MgsHalf => "mgsHalf",
            Route::MgsAll => "mgsAll",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Route::Zh => "Zhaohui",
            Route::PfHalf => "Pingfeng half",
            Route::PfAll => "Pingfeng full",
            Route::MgsHalf => "Moganshan half",
            Route::MgsAll => "Moganshan full",
        }
    }

    pub fn campus(self) -> Campus {
        match self {
            Route::Zh => Campus::Zhaohui,
            Route::PfHalf | Route::PfAll => Campus::Pingfeng,
            Route::MgsHalf | Route::MgsAll => Campus::Moganshan,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Contact {
    #[serde(default)]
    pub qq: String,
    #[serde(default)]
    pub wechat: String,
    pub tel: String,
}

/// A registered participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub open_id: String,
    pub name: String,
    pub gender: i8,
    pub stu_id: String,
    pub campus: u8,
    /// National identity number
    pub identity: String,
    pub status: TeamRole,
    pub qq: String,
    pub wechat: String,
    pub college: String,
    pub tel: String,
    pub created_op: u8,
    pub join_op: u8,
    pub team_id: i64,
    pub walk_status: WalkStatus,
    #[serde(rename = "type")]
    pub person_type: PersonType,
}

impl Person {
    pub fn has_team(&self) -> bool {
        self.team_id != NO_TEAM
    }

    /// Detach from the current team and reset walk progress
    pub fn leave_team(&mut self) {
        self.team_id = NO_TEAM;
        self.status = TeamRole::Unassigned;
        self.walk_status = WalkStatus::NotStarted;
    }

    pub fn contact(&self) -> Contact {
        Contact {
            qq: self.qq.clone(),
            wechat: self.wechat.clone(),
            tel: self.tel.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub route: Route,
    pub password: String,
    pub allow_match: bool,
    pub slogan: String,
    pub point: i8,
    pub status: TeamStatus,
    pub start_num: u32,
    pub num: u8,
    /// Captain's open id
    pub captain: String,
    /// Bound scan code, empty until the start point binds one
    #[serde(default)]
    pub code: String,
    pub submit: bool,
    pub time: DateTime<Utc>,
}

/// A route administrator stationed at one waypoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: u32,
    pub name: String,
    pub account: String,
    pub password: String,
    pub route: Route,
    pub point: i8,
}
