use quire_store::{Page, PageType, Reference, random_page_id};

use super::{PageTree, check_folder};
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::input::NewPage;
use crate::placement;
use crate::{ordering, revision};

impl PageTree {
    /// Create a page in `reference`.
    ///
    /// LINK pages take `published` and visibility from their target and
    /// TRANSLATION pages take `published` from their parent; the requested
    /// values are ignored for those types. A source without content is
    /// fetched before the page is stored.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] for an unknown parent or link
    /// target, a validation error when the tree rules reject the page,
    /// [`PageError::ContentUnsafe`] or [`PageError::TemplateProcessing`] for
    /// rejected content, [`PageError::UrlForbidden`] for a rejected source,
    /// and [`PageError::Technical`] for storage and fetch failures.
    pub fn create(
        &self,
        ctx: &ExecutionContext,
        reference: &Reference,
        new_page: NewPage,
    ) -> Result<Page, PageError> {
        self.in_scope(reference, || self.create_in_scope(ctx, reference, new_page))
    }

    pub(super) fn create_in_scope(
        &self,
        ctx: &ExecutionContext,
        reference: &Reference,
        input: NewPage,
    ) -> Result<Page, PageError> {
        if input.name.trim().is_empty() {
            return Err(PageError::action(input.page_type, "have an empty name"));
        }

        let parent = self.load_parent(input.page_type, reference, input.parent_id.as_deref())?;
        placement::check_placement(input.page_type, self.placement_under(parent.as_ref())?)?;

        let now = self.clock.now();
        let mut page = Page::new(
            input.id.unwrap_or_else(random_page_id),
            reference.clone(),
            input.page_type,
            input.name,
            now,
        );
        page.parent_id = input.parent_id;
        page.content = input.content;
        page.published = input.published;
        page.visibility = input.visibility;
        page.homepage = input.homepage;
        page.configuration = input.configuration;
        page.source = input.source;
        page.last_contributor = input.last_contributor;

        check_folder(&page)?;
        match page.page_type {
            PageType::Link => self.resolve_link(&mut page)?,
            PageType::Translation => {
                self.check_translation(&page)?;
                page.published = parent.as_ref().is_some_and(|p| p.published);
            }
            _ => {}
        }

        if let Some(source) = &page.source {
            self.check_source(source)?;
            if page.content.is_none() && page.page_type != PageType::Root {
                page.content = Some(self.fetch_source(source)?.content);
            }
        }
        self.check_content(ctx, &page, parent.as_ref())?;

        let mut shifts = None;
        if page.page_type.shifts_siblings() {
            let siblings =
                ordering::siblings(self.repository.as_ref(), reference, page.parent_id.as_deref())?;
            let (order, assignments) = ordering::plan_insert(&siblings, &page.id, input.order);
            page.order = order;
            shifts = Some((siblings, assignments));
        } else {
            page.order = input.order.unwrap_or(1).max(1);
        }

        let page = self.repository.create(page)?;
        if let Some((siblings, assignments)) = shifts {
            ordering::apply(self.repository.as_ref(), &siblings, &assignments)?;
        }
        if page.homepage {
            self.clear_other_homepages(&page)?;
        }
        if revision::is_eligible(page.page_type, parent.as_ref().map(|p| p.page_type)) {
            revision::record(self.revisions.as_ref(), &page, parent.as_ref(), now)?;
        }

        tracing::info!(
            page_id = %page.id,
            page_type = %page.page_type,
            reference = %page.reference,
            order = page.order,
            "Page created"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quire_store::{PageRepository, PageSource, RevisionStore, Visibility, config_keys};
    use serde_json::json;

    use crate::error::ErrorClass;
    use crate::testing::{Fixture, ctx, http_source};

    use super::*;

    fn api() -> Reference {
        Reference::api("api-1")
    }

    #[test]
    fn test_create_appends_in_order() {
        let fixture = Fixture::new();

        let p1 = fixture.create(NewPage::new(PageType::Markdown, "P1")).unwrap();
        let p2 = fixture.create(NewPage::new(PageType::Markdown, "P2")).unwrap();

        assert_eq!((p1.order, p2.order), (1, 2));
        assert_eq!(p1.reference, api());
    }

    #[test]
    fn test_create_with_order_shifts_siblings() {
        let fixture = Fixture::new();
        let p1 = fixture.create(NewPage::new(PageType::Markdown, "P1")).unwrap();
        let p2 = fixture.create(NewPage::new(PageType::Markdown, "P2")).unwrap();

        let first = fixture
            .create(NewPage::new(PageType::Markdown, "P0").with_order(1))
            .unwrap();

        assert_eq!(first.order, 1);
        assert_eq!(fixture.order_of(&p1.id), 2);
        assert_eq!(fixture.order_of(&p2.id), 3);
    }

    #[test]
    fn test_create_writes_first_revision() {
        let fixture = Fixture::new();

        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_content("# Guide"))
            .unwrap();
        let folder = fixture.create(NewPage::new(PageType::Folder, "Docs")).unwrap();

        let revisions = fixture.revisions.find_by_page(&page.id).unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].revision, 1);
        assert_eq!(revisions[0].content.as_deref(), Some("# Guide"));
        assert!(fixture.revisions.find_by_page(&folder.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let fixture = Fixture::new();

        let err = fixture.create(NewPage::new(PageType::Markdown, "  ")).unwrap_err();

        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_create_unknown_parent() {
        let fixture = Fixture::new();

        let err = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_parent("missing"))
            .unwrap_err();

        assert!(matches!(err, PageError::PageNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_create_parent_in_other_reference() {
        let fixture = Fixture::new();
        let folder = fixture
            .tree
            .create(&ctx(), &Reference::api("api-2"), NewPage::new(PageType::Folder, "Docs"))
            .unwrap();

        let err = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_parent(&folder.id))
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_folder_rules() {
        let fixture = Fixture::new();

        let with_content = fixture
            .create(NewPage::new(PageType::Folder, "Docs").with_content("text"))
            .unwrap_err();
        let homepage = fixture
            .create(NewPage::new(PageType::Folder, "Docs").with_homepage(true))
            .unwrap_err();

        assert!(matches!(with_content, PageError::PageFolderAction(_)));
        assert!(matches!(homepage, PageError::PageFolderAction(_)));
    }

    #[test]
    fn test_folder_with_source_rejected_before_fetch() {
        let fixture = Fixture::new();
        fixture.fetcher.respond("https://docs.example.com/guide.md", "# fetched");

        let folder = fixture
            .create(
                NewPage::new(PageType::Folder, "F")
                    .with_source(http_source("https://docs.example.com/guide.md")),
            )
            .unwrap_err();
        let system = fixture
            .create(
                NewPage::new(PageType::SystemFolder, "SYS")
                    .with_source(http_source("https://docs.example.com/guide.md")),
            )
            .unwrap_err();

        assert!(matches!(folder, PageError::PageFolderAction(_)));
        assert!(matches!(system, PageError::PageFolderAction(_)));
        assert_eq!(fixture.fetcher.calls(), 0);
        assert!(fixture.repository.pages().is_empty());
    }

    #[test]
    fn test_nested_folder_in_system_folder() {
        let fixture = Fixture::new();
        let system = fixture.create(NewPage::new(PageType::SystemFolder, "SYS")).unwrap();
        let folder = fixture
            .create(NewPage::new(PageType::Folder, "F").with_parent(&system.id))
            .unwrap();

        let err = fixture
            .create(NewPage::new(PageType::Folder, "G").with_parent(&folder.id))
            .unwrap_err();

        assert_eq!(folder.order, 1);
        assert!(matches!(err, PageError::PageFolderAction(_)));
    }

    #[test]
    fn test_link_copies_target_state() {
        let fixture = Fixture::new();
        let target = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_published(true)
                    .with_visibility(Visibility::Private),
            )
            .unwrap();

        let link = fixture
            .create(NewPage::new(PageType::Link, "To guide").with_content(&target.id))
            .unwrap();

        assert!(link.published);
        assert_eq!(link.visibility, Visibility::Private);
    }

    #[test]
    fn test_external_link_always_published() {
        let fixture = Fixture::new();

        let link = fixture
            .create(
                NewPage::new(PageType::Link, "Site")
                    .with_content("https://example.com")
                    .with_config(config_keys::LINK_RESOURCE_TYPE, "EXTERNAL"),
            )
            .unwrap();
        let root = fixture
            .create(NewPage::new(PageType::Link, "Home").with_content("root"))
            .unwrap();

        assert!(link.published);
        assert!(root.published);
    }

    #[test]
    fn test_link_validation() {
        let fixture = Fixture::new();
        let system = fixture.create(NewPage::new(PageType::SystemFolder, "SYS")).unwrap();

        let empty = fixture.create(NewPage::new(PageType::Link, "Empty")).unwrap_err();
        let missing = fixture
            .create(NewPage::new(PageType::Link, "Missing").with_content("nope"))
            .unwrap_err();
        let to_system = fixture
            .create(NewPage::new(PageType::Link, "Sys").with_content(&system.id))
            .unwrap_err();

        assert_eq!(empty.class(), ErrorClass::Validation);
        assert!(matches!(missing, PageError::PageNotFound(_)));
        assert_eq!(to_system.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_links_do_not_shift_siblings() {
        let fixture = Fixture::new();
        let p1 = fixture.create(NewPage::new(PageType::Markdown, "P1")).unwrap();

        let link = fixture
            .create(
                NewPage::new(PageType::Link, "L")
                    .with_content(&p1.id)
                    .with_order(1),
            )
            .unwrap();

        assert_eq!(link.order, 1);
        assert_eq!(fixture.order_of(&p1.id), 1);
    }

    #[test]
    fn test_translation_rules() {
        let fixture = Fixture::new();
        let page = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_published(true))
            .unwrap();

        let no_lang = fixture
            .create(NewPage::new(PageType::Translation, "Guide").with_parent(&page.id))
            .unwrap_err();
        let fr = fixture
            .create(
                NewPage::new(PageType::Translation, "Guide fr")
                    .with_parent(&page.id)
                    .with_config(config_keys::TRANSLATION_LANG, "fr"),
            )
            .unwrap();
        let duplicate = fixture
            .create(
                NewPage::new(PageType::Translation, "Guide fr 2")
                    .with_parent(&page.id)
                    .with_config(config_keys::TRANSLATION_LANG, "fr"),
            )
            .unwrap_err();
        let top_level = fixture
            .create(
                NewPage::new(PageType::Translation, "Orphan")
                    .with_config(config_keys::TRANSLATION_LANG, "de"),
            )
            .unwrap_err();

        assert_eq!(no_lang.class(), ErrorClass::Validation);
        assert!(fr.published);
        assert_eq!(duplicate.class(), ErrorClass::Validation);
        assert_eq!(top_level.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_unsafe_content_rejected_before_write() {
        let fixture = Fixture::new();

        let err = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_content("<script>alert(1)</script>"),
            )
            .unwrap_err();

        assert!(matches!(err, PageError::ContentUnsafe(_)));
        assert!(fixture.repository.pages().is_empty());
    }

    #[test]
    fn test_script_inside_html_block_rejected() {
        let fixture = Fixture::new();

        let backticks = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_content("<div>`<script>alert(1)</script>`</div>"),
            )
            .unwrap_err();
        let encoded = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_content(r#"<a href="jav&#x61;script:alert(1)">x</a>"#),
            )
            .unwrap_err();

        assert!(matches!(backticks, PageError::ContentUnsafe(_)));
        assert!(matches!(encoded, PageError::ContentUnsafe(_)));
        assert!(fixture.repository.pages().is_empty());
    }

    #[test]
    fn test_code_span_with_script_is_stored() {
        let fixture = Fixture::new();

        let page = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_content("Never paste `<script>` into a page."),
            )
            .unwrap();

        assert_eq!(page.content.as_deref(), Some("Never paste `<script>` into a page."));
    }

    #[test]
    fn test_unknown_template_property_strict() {
        let fixture = Fixture::new().with_context(json!({ "api": { "name": "Payments" } }));

        let err = fixture
            .create(NewPage::new(PageType::Markdown, "Guide").with_content("${api.version}"))
            .unwrap_err();
        let swagger = fixture.create(
            NewPage::new(PageType::Swagger, "Spec").with_content("${api.version}"),
        );

        assert_eq!(err.class(), ErrorClass::Templating);
        assert!(swagger.is_ok());
    }

    #[test]
    fn test_unknown_template_property_lenient() {
        let fixture = Fixture::new()
            .with_context(json!({ "api": { "name": "Payments" } }))
            .with_template_mode(quire_content::TemplateMode::Lenient);

        let page = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_content("# ${api.name} ${api.version}"),
            )
            .unwrap();

        assert_eq!(page.content.as_deref(), Some("# ${api.name} ${api.version}"));
        assert_eq!(fixture.repository.pages().len(), 1);
    }

    #[test]
    fn test_source_fetched_when_content_absent() {
        let fixture = Fixture::new();
        fixture.fetcher.respond("https://docs.example.com/guide.md", "# Remote");

        let page = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_source(http_source("https://docs.example.com/guide.md")),
            )
            .unwrap();

        assert_eq!(page.content.as_deref(), Some("# Remote"));
    }

    #[test]
    fn test_source_policy_enforced() {
        let fixture = Fixture::new();
        let mut bad_cron = http_source("https://docs.example.com/guide.md");
        bad_cron.fetch_cron = Some("sometimes".to_owned());

        let private = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_source(http_source("http://127.0.0.1/guide.md")),
            )
            .unwrap_err();
        let cron = fixture
            .create(
                NewPage::new(PageType::Markdown, "Guide")
                    .with_content("# Local")
                    .with_source(bad_cron),
            )
            .unwrap_err();

        assert!(matches!(private, PageError::UrlForbidden(_)));
        assert_eq!(cron.class(), ErrorClass::Technical);
        assert!(fixture.repository.pages().is_empty());
    }

    #[test]
    fn test_root_source_not_fetched_on_create() {
        let fixture = Fixture::new();
        let source = PageSource {
            kind: "http".to_owned(),
            ..PageSource::default()
        };

        let root = fixture
            .create(NewPage::new(PageType::Root, "Root").with_source(source))
            .unwrap();

        assert_eq!(root.content, None);
        assert_eq!(fixture.fetcher.calls(), 0);
    }

    #[test]
    fn test_single_homepage() {
        let fixture = Fixture::new();
        let first = fixture
            .create(NewPage::new(PageType::Markdown, "Home").with_homepage(true))
            .unwrap();

        let second = fixture
            .create(NewPage::new(PageType::Markdown, "New home").with_homepage(true))
            .unwrap();

        assert!(second.homepage);
        assert!(!fixture.repository.find_by_id(&first.id).unwrap().unwrap().homepage);
    }
}
