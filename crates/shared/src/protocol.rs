use serde::{Deserialize, Serialize};

use crate::domain::Delta;

pub const HEALTHZ_ROUTE: &str = "/healthz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    Query,
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Procedure {
    GetCounter,
    IncrementCounter,
    DecrementCounter,
}

impl Procedure {
    pub const ALL: [Procedure; 3] = [
        Procedure::GetCounter,
        Procedure::IncrementCounter,
        Procedure::DecrementCounter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Procedure::GetCounter => "getCounter",
            Procedure::IncrementCounter => "incrementCounter",
            Procedure::DecrementCounter => "decrementCounter",
        }
    }

    pub fn kind(self) -> ProcedureKind {
        match self {
            Procedure::GetCounter => ProcedureKind::Query,
            Procedure::IncrementCounter | Procedure::DecrementCounter => ProcedureKind::Mutation,
        }
    }

    pub fn http_method(self) -> &'static str {
        match self.kind() {
            ProcedureKind::Query => "GET",
            ProcedureKind::Mutation => "POST",
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            Procedure::GetCounter => "/counter",
            Procedure::IncrementCounter => "/counter/increment",
            Procedure::DecrementCounter => "/counter/decrement",
        }
    }

    pub fn delta(self) -> Option<Delta> {
        match self {
            Procedure::GetCounter => None,
            Procedure::IncrementCounter => Some(Delta::INCREMENT),
            Procedure::DecrementCounter => Some(Delta::DECREMENT),
        }
    }
}
