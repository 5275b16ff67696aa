//! Plan and category preconditions for unpublishing and deleting pages.

use quire_store::{Page, PageRepository, PageType};

use crate::cascade;
use crate::collaborators::{CategoryQuery, PlanQuery, PlanStatus};
use crate::context::ExecutionContext;
use crate::error::PageError;

/// Checks a page against the plans and categories that reference it.
pub struct PublicationGuard<'a> {
    repository: &'a dyn PageRepository,
    plans: &'a dyn PlanQuery,
    categories: &'a dyn CategoryQuery,
}

impl<'a> PublicationGuard<'a> {
    #[must_use]
    pub fn new(
        repository: &'a dyn PageRepository,
        plans: &'a dyn PlanQuery,
        categories: &'a dyn CategoryQuery,
    ) -> Self {
        Self {
            repository,
            plans,
            categories,
        }
    }

    /// Fail if `page` must stay published.
    ///
    /// A page stays published while it, or a LINK to it, is the general
    /// conditions of an active plan, or while a category shows it.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::UsedAsGeneralConditions`] or
    /// [`PageError::UsedByCategory`].
    pub fn check_unpublish(&self, ctx: &ExecutionContext, page: &Page) -> Result<(), PageError> {
        let mut ids = vec![page.id.clone()];
        ids.extend(
            cascade::links_to(self.repository, &page.id)?
                .into_iter()
                .map(|link| link.id),
        );
        self.check_plans(ctx, page, &ids, "unpublished", PlanStatus::is_active)?;

        let categories = self.categories.find_by_page(ctx, &page.id)?;
        if !categories.is_empty() {
            return Err(PageError::UsedByCategory {
                page_id: page.id.clone(),
                page_name: page.name.clone(),
                action: "unpublished",
                categories: categories.into_iter().map(|c| c.name).collect(),
            });
        }
        Ok(())
    }

    /// Fail if `page` may not be deleted.
    ///
    /// Categories block deletion outright. Plans block it unless closed; for a
    /// translation, plans using the translated page count too.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageAction`] or
    /// [`PageError::UsedAsGeneralConditions`].
    pub fn check_delete(&self, ctx: &ExecutionContext, page: &Page) -> Result<(), PageError> {
        let categories = self.categories.find_by_page(ctx, &page.id)?;
        if !categories.is_empty() {
            let names: Vec<String> = categories.into_iter().map(|c| c.name).collect();
            return Err(PageError::action(
                page.page_type,
                format!("be deleted because it is used by categories [{}]", names.join(", ")),
            ));
        }

        let mut ids = vec![page.id.clone()];
        if page.page_type == PageType::Translation {
            ids.extend(page.parent_id.clone());
        }
        self.check_plans(ctx, page, &ids, "deleted", |status| status != PlanStatus::Closed)
    }

    fn check_plans(
        &self,
        ctx: &ExecutionContext,
        page: &Page,
        ids: &[String],
        action: &'static str,
        blocking: impl Fn(PlanStatus) -> bool,
    ) -> Result<(), PageError> {
        for id in ids {
            let plans = self.plans.find_by_general_conditions(ctx, id)?;
            if let Some(plan) = plans.into_iter().find(|p| blocking(p.status)) {
                return Err(PageError::UsedAsGeneralConditions {
                    page_id: page.id.clone(),
                    page_name: page.name.clone(),
                    action,
                    plan_name: plan.name,
                });
            }
        }
        Ok(())
    }
}
