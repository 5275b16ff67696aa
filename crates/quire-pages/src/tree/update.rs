use quire_store::{Page, PageType};

use super::{PageTree, check_folder};
use crate::cascade::{self, CascadeChange};
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::input::PagePatch;
use crate::ordering::{self, Assignments};
use crate::placement;
use crate::revision;

impl PageTree {
    /// Apply `patch` to a page.
    ///
    /// A LINK keeps its `published` state unless its target changes. A
    /// TRANSLATION moved to a new parent takes the parent's state. Publication
    /// and visibility changes on other pages cascade to their dependents.
    ///
    /// # Errors
    ///
    /// Same as [`PageTree::create`], plus
    /// [`PageError::UsedAsGeneralConditions`] and [`PageError::UsedByCategory`]
    /// when unpublishing a page that plans or categories rely on.
    pub fn update(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        patch: PagePatch,
    ) -> Result<Page, PageError> {
        let reference = self.load(id)?.reference;
        self.in_scope(&reference, || self.update_in_scope(ctx, id, patch))
    }

    /// Move a page under `new_parent` (top level for `None`), optionally at
    /// `order`.
    ///
    /// # Errors
    ///
    /// Same as [`PageTree::update`].
    pub fn move_page(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        new_parent: Option<String>,
        order: Option<u32>,
    ) -> Result<Page, PageError> {
        let mut patch = PagePatch::new().parent(new_parent);
        patch.order = order;
        self.update(ctx, id, patch)
    }

    pub(super) fn update_in_scope(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        patch: PagePatch,
    ) -> Result<Page, PageError> {
        let old = self.load(id)?;
        let mut page = old.clone();

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(PageError::action(page.page_type, "have an empty name"));
            }
            page.name = name;
        }
        let content_patched = patch.content.is_some();
        if let Some(content) = patch.content {
            page.content = Some(content);
        }
        if let Some(parent_id) = patch.parent_id {
            page.parent_id = parent_id;
        }
        if let Some(published) = patch.published {
            page.published = published;
        }
        if let Some(visibility) = patch.visibility {
            page.visibility = visibility;
        }
        if let Some(homepage) = patch.homepage {
            page.homepage = homepage;
        }
        if let Some(configuration) = patch.configuration {
            page.configuration = configuration;
        }
        let source_patched = patch.source.is_some();
        if let Some(source) = patch.source {
            page.source = source;
        }
        if let Some(contributor) = patch.last_contributor {
            page.last_contributor = Some(contributor);
        }

        let parent_changed = page.parent_id != old.parent_id;
        let parent = match page.parent_id.as_deref() {
            Some(_) if parent_changed => {
                self.load_parent(page.page_type, &page.reference, page.parent_id.as_deref())?
            }
            Some(parent_id) => self.repository.find_by_id(parent_id)?,
            None => None,
        };
        if parent_changed {
            let target = self.placement_under(parent.as_ref())?;
            placement::check_placement(page.page_type, target)?;
            if page.page_type == PageType::Folder {
                placement::check_folder_move(self.placement_of(&old)?, target)?;
            }
            self.check_cycle(&page, parent.as_ref())?;
        }

        check_folder(&page)?;
        match page.page_type {
            PageType::Link => {
                if page.link_target() == old.link_target() {
                    page.published = old.published;
                    page.visibility = old.visibility;
                } else {
                    self.resolve_link(&mut page)?;
                }
            }
            PageType::Translation => {
                if parent_changed || page.configuration != old.configuration {
                    self.check_translation(&page)?;
                }
                if parent_changed {
                    page.published = parent.as_ref().is_some_and(|p| p.published);
                }
            }
            _ => {}
        }

        if source_patched && let Some(source) = &page.source {
            self.check_source(source)?;
            if !content_patched && page.page_type != PageType::Root {
                page.content = Some(self.fetch_source(source)?.content);
            }
        }
        if page.content != old.content || parent_changed {
            self.check_content(ctx, &page, parent.as_ref())?;
        }

        let dependents_follow = !matches!(page.page_type, PageType::Link | PageType::Translation);
        if dependents_follow && old.published && !page.published {
            self.guard().check_unpublish(ctx, &old)?;
        }

        let shifts = self.plan_order(&old, &mut page, patch.order, parent_changed)?;

        page.updated_at = self.clock.now();
        let page = self.repository.update(page)?;
        for (siblings, assignments) in &shifts {
            ordering::apply(self.repository.as_ref(), siblings, assignments)?;
        }
        if page.homepage && !old.homepage {
            self.clear_other_homepages(&page)?;
        }
        let parent_type = parent.as_ref().map(|p| p.page_type);
        if revision::should_revise(
            page.page_type,
            parent_type,
            &old.name,
            &page.name,
            old.content.as_deref(),
            page.content.as_deref(),
        ) {
            revision::record(self.revisions.as_ref(), &page, parent.as_ref(), page.updated_at)?;
        }
        if dependents_follow {
            let change = CascadeChange::between(&old, &page);
            cascade::cascade(self.repository.as_ref(), &page, change, page.updated_at)?;
        }

        tracing::info!(page_id = %page.id, order = page.order, "Page updated");
        Ok(page)
    }

    /// Order of the updated page and the sibling shifts it causes.
    fn plan_order(
        &self,
        old: &Page,
        page: &mut Page,
        desired: Option<u32>,
        parent_changed: bool,
    ) -> Result<Vec<(Vec<Page>, Assignments)>, PageError> {
        let repository = self.repository.as_ref();
        if !page.page_type.shifts_siblings() {
            if let Some(order) = desired {
                page.order = order.max(1);
            }
            return Ok(Vec::new());
        }

        if parent_changed {
            let mut left =
                ordering::siblings(repository, &old.reference, old.parent_id.as_deref())?;
            left.retain(|p| p.id != page.id);
            let closing = ordering::plan_remove(&left);

            let mut joined =
                ordering::siblings(repository, &page.reference, page.parent_id.as_deref())?;
            joined.retain(|p| p.id != page.id);
            let (order, opening) = ordering::plan_insert(&joined, &page.id, desired);
            page.order = order;
            return Ok(vec![(left, closing), (joined, opening)]);
        }

        match desired {
            Some(order) if order != old.order => {
                let siblings =
                    ordering::siblings(repository, &page.reference, page.parent_id.as_deref())?;
                let mut assignments = ordering::plan_move(&siblings, &page.id, order);
                page.order = assignments.remove(&page.id).unwrap_or(old.order);
                Ok(vec![(siblings, assignments)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quire_store::{PageRepository, Reference, RevisionStore, Visibility, config_keys};
    use crate::collaborators::PlanStatus;
    use crate::error::ErrorClass;
    use crate::input::NewPage;
    use crate::testing::{Fixture, ctx, http_source};

    use super::*;

    #[test]
    fn test_identical_update_creates_no_revision() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_content("# Guide"))
            .unwrap();

        fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().content("# Guide").name("Guide"))
            .unwrap();
        assert_eq!(fixture.revisions.find_by_page(&page.id).unwrap().len(), 1);

        fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().name("Guide v2"))
            .unwrap();
        let revisions = fixture.revisions.find_by_page(&page.id).unwrap();
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[1].name, "Guide v2");
    }

    #[test]
    fn test_reorder_moves_siblings() {
        let fixture = Fixture::new();
        let ids: Vec<String> = ["A", "B", "C", "D"]
            .into_iter()
            .map(|name| fixture.create(NewPage::new(PageType::Markdown, name)).unwrap().id)
            .collect();

        let moved = fixture
            .tree
            .update(&ctx(), &ids[0], PagePatch::new().order(3))
            .unwrap();

        assert_eq!(moved.order, 3);
        let orders: Vec<u32> = ids.iter().map(|id| fixture.order_of(id)).collect();
        assert_eq!(orders, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_reorder_clamps_to_scope() {
        let fixture = Fixture::new();
        let a = fixture.create(NewPage::new(PageType::Markdown, "A")).unwrap();
        let b = fixture.create(NewPage::new(PageType::Markdown, "B")).unwrap();

        let moved = fixture.tree.update(&ctx(), &a.id, PagePatch::new().order(42)).unwrap();

        assert_eq!(moved.order, 2);
        assert_eq!(fixture.order_of(&b.id), 1);
    }

    #[test]
    fn test_move_between_folders_keeps_orders_contiguous() {
        let fixture = Fixture::new();
        let left = fixture.create(NewPage::new(PageType::Folder, "Left")).unwrap();
        let right = fixture.create(NewPage::new(PageType::Folder, "Right")).unwrap();
        let in_left: Vec<String> = ["A", "B", "C"]
            .into_iter()
            .map(|name| {
                fixture
                    .create(NewPage::new(PageType::Markdown, name).with_parent(&left.id))
                    .unwrap()
                    .id
            })
            .collect();
        let r1 = fixture
            .create(NewPage::new(PageType::Markdown, "R1").with_parent(&right.id))
            .unwrap();

        let moved = fixture
            .tree
            .move_page(&ctx(), &in_left[0], Some(right.id.clone()), Some(1))
            .unwrap();

        assert_eq!(moved.parent_id.as_deref(), Some(right.id.as_str()));
        assert_eq!(moved.order, 1);
        assert_eq!(fixture.order_of(&r1.id), 2);
        assert_eq!(fixture.order_of(&in_left[1]), 1);
        assert_eq!(fixture.order_of(&in_left[2]), 2);
    }

    #[test]
    fn test_move_into_descendant_rejected() {
        let fixture = Fixture::new();
        let outer = fixture.create(NewPage::new(PageType::Folder, "Outer")).unwrap();
        let inner = fixture
            .create(NewPage::new(PageType::Folder, "Inner").with_parent(&outer.id))
            .unwrap();

        let into_child = fixture
            .tree
            .move_page(&ctx(), &outer.id, Some(inner.id.clone()), None)
            .unwrap_err();
        let into_self = fixture
            .tree
            .move_page(&ctx(), &outer.id, Some(outer.id.clone()), None)
            .unwrap_err();

        assert_eq!(into_child.class(), ErrorClass::Validation);
        assert_eq!(into_self.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_system_folder_boundary_on_move() {
        let fixture = Fixture::new();
        let system = fixture.create(NewPage::new(PageType::SystemFolder, "SYS")).unwrap();
        let inside = fixture
            .create(NewPage::new(PageType::Folder, "Inside").with_parent(&system.id))
            .unwrap();
        let outside = fixture.create(NewPage::new(PageType::Folder, "Outside")).unwrap();

        let out = fixture.tree.move_page(&ctx(), &inside.id, None, None).unwrap_err();
        let into = fixture
            .tree
            .move_page(&ctx(), &outside.id, Some(system.id.clone()), None)
            .unwrap_err();
        let system_down = fixture
            .tree
            .move_page(&ctx(), &system.id, Some(outside.id.clone()), None)
            .unwrap_err();

        assert_eq!(out.class(), ErrorClass::Validation);
        assert_eq!(into.class(), ErrorClass::Validation);
        assert_eq!(system_down.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_unpublish_cascades_to_links_and_translations() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "P").with_published(true))
            .unwrap();
        let l1 = fixture
            .create(NewPage::new(PageType::Link, "L1").with_content(&page.id))
            .unwrap();
        let l2 = fixture
            .tree
            .create(
                &ctx(),
                &Reference::environment("DEFAULT"),
                NewPage::new(PageType::Link, "L2").with_content(&page.id),
            )
            .unwrap();
        let t1 = fixture
            .create(
                NewPage::new(PageType::Translation, "L1 fr")
                    .with_parent(&l1.id)
                    .with_config(config_keys::TRANSLATION_LANG, "fr"),
            )
            .unwrap();
        assert!(l1.published && l2.published && t1.published);

        fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().published(false))
            .unwrap();

        for id in [&l1.id, &l2.id, &t1.id] {
            assert!(!fixture.page(id).published, "{id}");
        }
    }

    #[test]
    fn test_visibility_cascades_to_translations() {
        let fixture = Fixture::new();
        let page = fixture.create(NewPage::new(PageType::Markdown, "P")).unwrap();
        let translation = fixture
            .create(
                NewPage::new(PageType::Translation, "P de")
                    .with_parent(&page.id)
                    .with_config(config_keys::TRANSLATION_LANG, "de"),
            )
            .unwrap();

        fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().visibility(Visibility::Private))
            .unwrap();

        assert_eq!(fixture.page(&translation.id).visibility, Visibility::Private);
    }

    #[test]
    fn test_link_publication_is_not_patched_directly() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "P").with_published(true))
            .unwrap();
        let other = fixture.create(NewPage::new(PageType::Markdown, "Other")).unwrap();
        let link = fixture
            .create(NewPage::new(PageType::Link, "L").with_content(&page.id))
            .unwrap();

        let unchanged = fixture
            .tree
            .update(&ctx(), &link.id, PagePatch::new().published(false))
            .unwrap();
        let retargeted = fixture
            .tree
            .update(&ctx(), &link.id, PagePatch::new().content(&other.id))
            .unwrap();

        assert!(unchanged.published);
        assert!(!retargeted.published);
    }

    #[test]
    fn test_unpublish_blocked_by_plan() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Terms").with_published(true))
            .unwrap();
        fixture.plans.add_plan(&page.id, "Gold", PlanStatus::Published);

        let err = fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().published(false))
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Conflict);
        assert!(fixture.page(&page.id).published);
    }

    #[test]
    fn test_unpublish_blocked_by_category() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Payments").with_published(true))
            .unwrap();
        fixture.categories.add_category(&page.id, "payments");

        let err = fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().published(false))
            .unwrap_err();

        assert!(matches!(err, PageError::UsedByCategory { .. }));
    }

    #[test]
    fn test_translation_reparent_copies_published() {
        let fixture = Fixture::new();
        let draft = fixture.create(NewPage::new(PageType::Markdown, "Draft")).unwrap();
        let live = fixture
            .create(NewPage::new(PageType::Markdown, "Live").with_published(true))
            .unwrap();
        let translation = fixture
            .create(
                NewPage::new(PageType::Translation, "T")
                    .with_parent(&draft.id)
                    .with_config(config_keys::TRANSLATION_LANG, "fr"),
            )
            .unwrap();
        assert!(!translation.published);

        let moved = fixture
            .tree
            .move_page(&ctx(), &translation.id, Some(live.id.clone()), None)
            .unwrap();

        assert!(moved.published);
    }

    #[test]
    fn test_update_rejects_unsafe_content_without_write() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_content("# Guide"))
            .unwrap();

        let err = fixture
            .tree
            .update(
                &ctx(),
                &page.id,
                PagePatch::new().content("<img src=x onerror=alert(1)>"),
            )
            .unwrap_err();

        assert!(matches!(err, PageError::ContentUnsafe(_)));
        assert_eq!(fixture.page(&page.id).content.as_deref(), Some("# Guide"));
    }

    #[test]
    fn test_update_source_fetches_content() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_content("# Local"))
            .unwrap();
        fixture.fetcher.respond("https://docs.example.com/guide.md", "# Remote");

        let updated = fixture
            .tree
            .update(
                &ctx(),
                &page.id,
                PagePatch::new().source(Some(http_source("https://docs.example.com/guide.md"))),
            )
            .unwrap();

        assert_eq!(updated.content.as_deref(), Some("# Remote"));
        assert!(updated.source.is_some());
    }

    #[test]
    fn test_update_rejects_source_on_folder() {
        let fixture = Fixture::new();
        let folder = fixture.create(NewPage::new(PageType::Folder, "Docs")).unwrap();
        fixture.fetcher.respond("https://docs.example.com/guide.md", "# fetched");

        let err = fixture
            .tree
            .update(
                &ctx(),
                &folder.id,
                PagePatch::new().source(Some(http_source("https://docs.example.com/guide.md"))),
            )
            .unwrap_err();

        assert!(matches!(err, PageError::PageFolderAction(_)));
        assert_eq!(fixture.fetcher.calls(), 0);
        assert_eq!(fixture.page(&folder.id).content, None);
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let fixture = Fixture::new();
        let page = fixture.create(NewPage::new(PageType::Markdown, "Guide")).unwrap();
        fixture.clock.advance(chrono::Duration::minutes(5));

        let updated = fixture
            .tree
            .update(&ctx(), &page.id, PagePatch::new().name("Guide 2"))
            .unwrap();

        assert_eq!(updated.updated_at - page.updated_at, chrono::Duration::minutes(5));
        assert_eq!(updated.created_at, page.created_at);
    }

    #[test]
    fn test_update_missing_page() {
        let fixture = Fixture::new();

        let err = fixture
            .tree
            .update(&ctx(), "missing", PagePatch::new().name("x"))
            .unwrap_err();

        assert!(matches!(err, PageError::PageNotFound(_)));
        assert!(fixture.repository.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_system_folder_scenario() {
        let fixture = Fixture::new();
        let portal = Reference::environment("DEFAULT");
        let system = fixture
            .tree
            .create(&ctx(), &portal, NewPage::new(PageType::SystemFolder, "SYS"))
            .unwrap();

        let target = fixture
            .tree
            .create(&ctx(), &portal, NewPage::new(PageType::Markdown, "X"))
            .unwrap();

        let link = fixture
            .tree
            .create(
                &ctx(),
                &portal,
                NewPage::new(PageType::Link, "L")
                    .with_parent(&system.id)
                    .with_content(&target.id),
            )
            .unwrap_err();
        let folder = fixture
            .tree
            .create(
                &ctx(),
                &portal,
                NewPage::new(PageType::Folder, "F").with_parent(&system.id),
            )
            .unwrap();
        let p1 = fixture.create(NewPage::new(PageType::Markdown, "P1")).unwrap();
        let p2 = fixture.create(NewPage::new(PageType::Markdown, "P2")).unwrap();
        let revisions_before = fixture.revisions.len();

        fixture.tree.update(&ctx(), &p1.id, PagePatch::new().order(2)).unwrap();

        assert!(matches!(link, PageError::PageAction { .. }));
        assert_eq!(folder.order, 1);
        assert_eq!((p1.order, p2.order), (1, 2));
        assert_eq!(fixture.order_of(&p1.id), 2);
        assert_eq!(fixture.order_of(&p2.id), 1);
        assert_eq!(fixture.revisions.len(), revisions_before);
    }
}
