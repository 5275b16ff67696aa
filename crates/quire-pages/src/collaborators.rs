//! Read-only services consumed by the page tree.
//!
//! Plans, categories and template metadata are owned by other subsystems. The
//! page tree only queries them, through the traits below. Each trait has a
//! null implementation for deployments (and tests) without that subsystem.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use quire_store::Reference;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::PageError;

/// Plan lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanStatus {
    Staging,
    Published,
    Deprecated,
    Closed,
}

impl PlanStatus {
    /// Plans that subscribers currently see.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Published | Self::Deprecated)
    }
}

/// Plan fields relevant to page guards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanSummary {
    pub id: String,
    pub name: String,
    pub status: PlanStatus,
}

/// Category fields relevant to page guards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// Plans referencing pages as their general conditions.
pub trait PlanQuery: Send + Sync {
    /// Plans whose general conditions page is `page_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the plan service fails.
    fn find_by_general_conditions(
        &self,
        ctx: &ExecutionContext,
        page_id: &str,
    ) -> Result<Vec<PlanSummary>, PageError>;
}

/// Categories showing a page as their description.
pub trait CategoryQuery: Send + Sync {
    /// Categories referencing `page_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the category service fails.
    fn find_by_page(
        &self,
        ctx: &ExecutionContext,
        page_id: &str,
    ) -> Result<Vec<CategorySummary>, PageError>;
}

/// Builds the template context of a reference scope.
pub trait TemplateContextProvider: Send + Sync {
    /// Context for `${...}` expressions, e.g. `{"api": {"metadata": {...}}}`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if metadata cannot be loaded.
    fn context(&self, ctx: &ExecutionContext, reference: &Reference) -> Result<Value, PageError>;
}

/// Current time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// No plan references any page.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlans;

impl PlanQuery for NoPlans {
    fn find_by_general_conditions(
        &self,
        _ctx: &ExecutionContext,
        _page_id: &str,
    ) -> Result<Vec<PlanSummary>, PageError> {
        Ok(Vec::new())
    }
}

/// No category references any page.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCategories;

impl CategoryQuery for NoCategories {
    fn find_by_page(
        &self,
        _ctx: &ExecutionContext,
        _page_id: &str,
    ) -> Result<Vec<CategorySummary>, PageError> {
        Ok(Vec::new())
    }
}

/// Template context holding only the reference itself.
///
/// Exposes `${reference.type}` and `${reference.id}`, plus `${api.id}` for
/// API pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyTemplateContext;

impl TemplateContextProvider for EmptyTemplateContext {
    fn context(&self, _ctx: &ExecutionContext, reference: &Reference) -> Result<Value, PageError> {
        let mut context = serde_json::json!({
            "reference": { "type": reference.kind, "id": reference.id },
        });
        if reference.kind == quire_store::ReferenceType::Api {
            context["api"] = serde_json::json!({ "id": reference.id });
        }
        Ok(context)
    }
}
