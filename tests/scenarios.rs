//! End to end scenarios over a real sled database
//!
//! Each test opens its own database in a temp dir, since sled holds a file
//! lock per database.

use action_link::{
    ActionDefinition, ActionLinkError, ActionLinkService, ActionRequest, ActionResponse, PatchOp,
    Settings,
    account::Account,
    entity::{Entity, EntityId, FieldValue},
    error::StoreError,
    link_style::PartialUpdate,
    parameter::{DynamicParameter, ParameterConverter, ParameterValue, RouteParameters},
    placeholder::PageShell,
    registry::{LinkStyleRegistry, PluginContext, StateActionRegistry},
    store::{EntityStore, KeyValueStore, SledStore},
};
use std::{
    io,
    sync::{Arc, Mutex},
};
use tempfile::{TempDir, tempdir};
use tracing_subscriber::fmt::MakeWriter;

struct Fixture {
    _dir: TempDir,
    store: Arc<SledStore>,
    service: ActionLinkService,
}

fn settings() -> Settings {
    Settings {
        token_key: Some("scenario-key".into()),
        default_redirect: "/front".into(),
        ..Settings::default()
    }
}

fn fixture() -> anyhow::Result<Fixture> {
    let dir = tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("action_link.db"))?);
    let store = Arc::new(SledStore::new(db.clone())?);
    let service = ActionLinkService::new(db, settings())?;
    Ok(Fixture {
        _dir: dir,
        store,
        service,
    })
}

fn toggle_pub() -> ActionDefinition {
    ActionDefinition::new("toggle_pub", "Toggle published", "boolean_field", "nojs")
        .with_config("entity_type", "article")
        .with_config("field_name", "published")
}

fn cart() -> ActionDefinition {
    ActionDefinition::new("cart", "Shopping cart", "counter", "ajax")
}

fn editor() -> Account {
    Account::new(1)
        .with_permission("use toggle_pub action links")
        .with_permission("edit any article")
}

fn shopper() -> Account {
    Account::new(3).with_permission("use cart action links")
}

fn article(store: &SledStore, id: EntityId, published: bool) -> anyhow::Result<Entity> {
    let mut entity = Entity::new("article", id, 1).with_field("published", FieldValue::Boolean(published));
    store.save(&mut entity)?;
    Ok(entity)
}

fn published(store: &SledStore, id: EntityId) -> anyhow::Result<Option<FieldValue>> {
    Ok(store
        .load("article", id)?
        .and_then(|entity| entity.field("published").cloned()))
}

fn apples() -> RouteParameters {
    RouteParameters::new(vec![("item".into(), "apple".into())])
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    (out, logs)
}

#[test]
fn toggle_published_then_repeat_is_a_no_op() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    let entity = article(&fx.store, 7, true)?;

    let links = fx.service.build_link_set(&toggle_pub(), &editor(), vec![entity.into()])?;
    let link = links.get("toggle").expect("toggle link");
    assert_eq!(link.state.as_deref(), Some("false"));
    let url = link.url.clone().expect("reachable").to_string();

    let first = fx.service.handle(&ActionRequest::from_url(&url, editor()))?;
    assert!(first.completed);
    assert_eq!(
        first.response,
        ActionResponse::Redirect {
            location: "/front".into(),
            message: Some("published set to false.".into())
        }
    );
    assert_eq!(published(&fx.store, 7)?, Some(FieldValue::Boolean(false)));

    let second = fx
        .service
        .handle(&ActionRequest::from_url(&url, editor()).with_referer("/node/7"))?;
    assert!(!second.completed);
    assert_eq!(
        second.response,
        ActionResponse::Redirect {
            location: "/node/7".into(),
            message: None
        }
    );
    assert_eq!(published(&fx.store, 7)?, Some(FieldValue::Boolean(false)));
    Ok(())
}

#[test]
fn stale_link_is_ignored_after_a_concurrent_change() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    let entity = article(&fx.store, 7, true)?;

    let url = fx
        .service
        .build_single_link(&toggle_pub(), "toggle", &editor(), vec![entity.into()])?
        .and_then(|link| link.url)
        .expect("reachable")
        .to_string();

    // someone else unpublishes first
    article(&fx.store, 7, false)?;

    let (resolved, logs) = capture_logs(|| fx.service.handle(&ActionRequest::from_url(&url, editor())));
    let resolved = resolved?;
    assert!(!resolved.completed);
    assert!(logs.contains("stale action link ignored"));
    assert_eq!(published(&fx.store, 7)?, Some(FieldValue::Boolean(false)));
    Ok(())
}

#[test]
fn link_style_can_be_overridden_per_request() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    let entity = article(&fx.store, 7, false)?;

    let ajax = toggle_pub().with_link_style("ajax");
    let links = fx.service.build_link_set(&ajax, &editor(), vec![entity.into()])?;
    let link = links.get("toggle").expect("toggle link");
    let wrapper = link.wrapper_id.clone().expect("ajax links are wrapped");
    let url = link.url.clone().expect("reachable").to_string();
    assert!(url.starts_with("/action-link/toggle_pub/ajax/toggle/true/1/7?token="));

    let resolved = fx.service.handle(&ActionRequest::from_url(&url, editor()))?;
    assert!(resolved.completed);

    let ActionResponse::Patch(ops) = resolved.response else {
        panic!("expected a patch, got {:?}", resolved.response);
    };
    let PatchOp::Replace { selector, html } = &ops[0] else {
        panic!("expected a replace first");
    };
    assert_eq!(selector, &format!("#{wrapper}"));
    assert!(html.contains("/action-link/toggle_pub/ajax/toggle/false/1/7?token="));
    assert_eq!(
        ops.last(),
        Some(&PatchOp::Message {
            selector: PartialUpdate::message_selector("toggle_pub", "toggle"),
            message: "published set to true.".into(),
        })
    );

    // the stored definition keeps its own style
    assert_eq!(fx.service.load_definition("toggle_pub")?.link_style_id(), "nojs");
    Ok(())
}

#[test]
fn cart_remove_placeholder_becomes_a_link() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&cart())?;

    let links = fx.service.build_link_set(&cart(), &shopper(), vec!["apple".into()])?;
    assert_eq!(links.directions().collect::<Vec<_>>(), vec!["add", "remove"]);
    assert!(links.get("remove").is_some_and(|link| link.is_placeholder()));
    assert_eq!(
        links.get("add").and_then(|link| link.direction_label.as_deref()),
        Some("Add")
    );

    let url = links
        .get("add")
        .and_then(|link| link.url.clone())
        .expect("add is reachable")
        .to_string();
    let resolved = fx.service.handle(&ActionRequest::from_url(&url, shopper()))?;
    assert!(resolved.completed);
    assert_eq!(fx.store.get("cart", "3:apple")?, Some(1));

    let ActionResponse::Patch(ops) = resolved.response else {
        panic!("expected a patch");
    };
    let remove_wrapper = PartialUpdate::wrapper_id("cart", "remove", 3, &apples());
    let remove = ops
        .iter()
        .find_map(|op| match op {
            PatchOp::Replace { selector, html } if *selector == format!("#{remove_wrapper}") => Some(html),
            _ => None,
        })
        .expect("remove region replaced");
    assert!(remove.contains("/action-link/cart/ajax/remove/0/3/apple?token="));
    Ok(())
}

#[test]
fn denied_directions_are_omitted() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&cart())?;
    fx.store.set("cart", "4:pear", 2)?;

    let adder = Account::new(4).with_permission("use cart action links in add direction");
    let links = fx.service.build_link_set(&cart(), &adder, vec!["pear".into()])?;

    assert_eq!(links.directions().collect::<Vec<_>>(), vec!["add"]);
    assert!(
        fx.service
            .build_single_link(&cart(), "remove", &adder, vec!["pear".into()])?
            .is_none()
    );
    Ok(())
}

#[test]
fn bad_or_missing_tokens_are_rejected() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    article(&fx.store, 7, true)?;
    let path = "/action-link/toggle_pub/nojs/toggle/false/1/7";

    let (missing, logs) = capture_logs(|| fx.service.handle(&ActionRequest::new(path, editor())));
    assert!(matches!(missing, Err(ActionLinkError::InvalidToken(_))));
    assert!(logs.contains("WARN"));
    assert!(logs.contains("action link token rejected"));

    let forged = fx
        .service
        .handle(&ActionRequest::new(path, editor()).with_token(&"00".repeat(32)));
    let err = forged.unwrap_err();
    assert_eq!(err.status_code(), 403);

    assert_eq!(published(&fx.store, 7)?, Some(FieldValue::Boolean(true)));
    Ok(())
}

#[test]
fn access_is_rechecked_when_following() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    let entity = article(&fx.store, 7, true)?;

    let url = fx
        .service
        .build_single_link(&toggle_pub(), "toggle", &editor(), vec![entity.into()])?
        .and_then(|link| link.url)
        .expect("reachable")
        .to_string();

    // same user, permissions revoked since the link was rendered
    let revoked = Account::new(1);
    let (denied, logs) = capture_logs(|| fx.service.handle(&ActionRequest::from_url(&url, revoked)));
    assert!(matches!(
        denied,
        Err(ActionLinkError::AccessDenied { ref action, ref direction })
            if action == "toggle_pub" && direction == "toggle"
    ));
    assert!(logs.contains("WARN"));
    assert!(logs.contains("action link access denied"));

    // a link issued to someone else
    let other = Account::new(2)
        .with_permission("use toggle_pub action links")
        .with_permission("edit any article");
    let err = fx
        .service
        .handle(&ActionRequest::from_url(&url, other))
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    assert_eq!(published(&fx.store, 7)?, Some(FieldValue::Boolean(true)));
    Ok(())
}

/// Reads through to sled, refuses every write.
struct ReadOnlyEntities(Arc<SledStore>);

impl EntityStore for ReadOnlyEntities {
    fn load(&self, entity_type: &str, id: EntityId) -> Result<Option<Entity>, StoreError> {
        self.0.load(entity_type, id)
    }
    fn save(&self, _entity: &mut Entity) -> Result<(), StoreError> {
        Err(StoreError::Rejected("storage is read only".into()))
    }
}

#[test]
fn failed_writes_are_never_reported_as_completed() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("action_link.db"))?);
    let store = Arc::new(SledStore::new(db)?);
    article(&store, 7, true)?;

    let context = PluginContext {
        entities: Arc::new(ReadOnlyEntities(store.clone())),
        key_value: store.clone(),
    };
    let mut service = ActionLinkService::with_parts(
        settings(),
        context,
        store.clone(),
        StateActionRegistry::with_defaults()?,
        LinkStyleRegistry::with_defaults(),
    )?;
    service.save_definition(&toggle_pub())?;

    let entity = store.load("article", 7)?.expect("article 7");
    let url = service
        .build_single_link(&toggle_pub(), "toggle", &editor(), vec![entity.into()])?
        .and_then(|link| link.url)
        .expect("reachable")
        .to_string();

    let (result, logs) = capture_logs(|| service.handle(&ActionRequest::from_url(&url, editor())));
    let err = result.unwrap_err();
    let ActionLinkError::TransitionFailed { ref state, ref message, .. } = err else {
        panic!("expected a failed transition, got {err:?}");
    };
    assert_eq!(state, "false");
    assert_eq!(message, "Boolean field could not be applied.");
    assert!(err.to_string().contains(message.as_str()));
    assert_eq!(err.status_code(), 500);
    assert!(logs.contains("ERROR"));
    assert!(logs.contains("Boolean field could not be applied."));

    assert_eq!(published(&store, 7)?, Some(FieldValue::Boolean(true)));
    Ok(())
}

#[test]
fn cached_pages_resolve_per_user() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&cart())?;
    fx.store.set("cart", "3:apple", 1)?;

    let lazy = fx.service.lazy_link_set("cart", apples())?.with_link_style("nojs");
    let marker = lazy.marker();
    let page = PageShell::new()
        .markup("<div class=\"product\">")
        .hole(lazy)
        .markup("</div>")
        .into_cached();
    assert_eq!(page.markup(), format!("<div class=\"product\">{marker}</div>"));

    let mine = page.resolve(&fx.service, &shopper());
    let theirs = page.resolve(&fx.service, &Account::new(5).with_permission("use cart action links"));

    assert!(mine.contains("/action-link/cart/nojs/remove/0/3/apple?token="));
    assert!(!theirs.contains("/remove/"));
    assert!(theirs.contains("/action-link/cart/nojs/add/1/5/apple?token="));
    assert!(!mine.contains("<!--"));

    assert!(matches!(
        fx.service.lazy_link_set("missing", apples()),
        Err(ActionLinkError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn wrong_entity_type_is_an_invalid_parameter() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    let mut page = Entity::new("page", 7, 1).with_field("published", FieldValue::Boolean(true));
    fx.store.save(&mut page)?;

    let err = fx
        .service
        .build_link_set(&toggle_pub(), &editor(), vec![page.into()])
        .unwrap_err();
    assert!(matches!(err, ActionLinkError::InvalidParameter { .. }));
    assert_eq!(err.status_code(), 400);
    Ok(())
}

#[test]
fn unknown_direction_in_a_followed_url_is_a_bad_request() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    article(&fx.store, 7, true)?;

    let path = "/action-link/toggle_pub/nojs/sideways/false/1/7";
    let token = fx.service.tokens().get(path)?;
    let err = fx
        .service
        .handle(&ActionRequest::new(path, editor()).with_token(&token))
        .unwrap_err();

    assert!(matches!(err, ActionLinkError::InvalidParameter { ref name, .. } if name == "direction"));
    assert_eq!(err.status_code(), 400);
    assert_eq!(published(&fx.store, 7)?, Some(FieldValue::Boolean(true)));
    Ok(())
}

#[test]
fn broken_placeholder_renders_empty_and_warns() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&toggle_pub())?;
    fx.service.save_definition(&cart())?;

    // article 99 was never saved
    let missing = fx
        .service
        .lazy_link_set("toggle_pub", RouteParameters::new(vec![("entity".into(), "99".into())]))?;
    let page = PageShell::new()
        .markup("<p>")
        .hole(missing)
        .markup("</p><p>")
        .hole(fx.service.lazy_link_set("cart", apples())?)
        .markup("</p>")
        .into_cached();

    let (html, logs) = capture_logs(|| page.resolve(&fx.service, &editor()));
    assert!(html.starts_with("<p></p><p>"));
    assert!(!html.contains("<!--"));
    assert!(logs.contains("WARN"));
    assert!(logs.contains("placeholder left empty"));
    assert!(logs.contains("toggle_pub"));
    Ok(())
}

#[test]
fn lookalike_items_keep_separate_links() -> anyhow::Result<()> {
    let mut fx = fixture()?;
    fx.service.save_definition(&cart())?;
    let item = |name: &str| RouteParameters::new(vec![("item".into(), name.into())]);

    let spaced = fx.service.build_link_set(&cart(), &shopper(), vec!["apple pie".into()])?;
    let cased = fx.service.build_link_set(&cart(), &shopper(), vec!["Apple_Pie".into()])?;
    let key = |links: &action_link::LinkSet| links.get("add").map(|link| (link.key.clone(), link.wrapper_id.clone()));
    assert_ne!(key(&spaced), key(&cased));

    let page = PageShell::new()
        .hole(fx.service.lazy_link_set("cart", item("apple pie"))?)
        .markup("|")
        .hole(fx.service.lazy_link_set("cart", item("apple-pie"))?)
        .into_cached();
    assert_eq!(page.holes().len(), 2);

    let html = page.resolve(&fx.service, &shopper());
    let (first, second) = html.split_once('|').expect("separator kept");
    assert!(first.contains("/action-link/cart/ajax/add/1/3/apple+pie?token="));
    assert!(second.contains("/action-link/cart/ajax/add/1/3/apple-pie?token="));
    Ok(())
}

/// Refuses every route value, as a shop whose stock ran out would.
struct SoldOut;

impl ParameterConverter for SoldOut {
    fn upcast(&self, parameter: &DynamicParameter, raw: &str) -> action_link::Result<ParameterValue> {
        Err(ActionLinkError::InvalidParameter {
            name: parameter.name.clone(),
            reason: format!("`{raw}` is sold out"),
        })
    }
}

#[test]
fn custom_converter_decides_upcasting() -> anyhow::Result<()> {
    let Fixture { _dir, store, service } = fixture()?;
    let mut service = service.with_converter(Box::new(SoldOut));
    service.save_definition(&cart())?;

    let url = service
        .build_single_link(&cart(), "add", &shopper(), vec!["apple".into()])?
        .and_then(|link| link.url)
        .expect("add is reachable")
        .to_string();
    let err = service
        .handle(&ActionRequest::from_url(&url, shopper()))
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("sold out"));
    assert_eq!(store.get("cart", "3:apple")?, None);
    Ok(())
}
