//! # Composition Properties
//!
//! End-to-end checks of the entity model through the `Realm` surface:
//!
//! 1. **Shadowing** and **chain order** in the resolver
//! 2. **Immutability** of frozen and sealed templates
//! 3. **Composition order** and **sharing vs. independence** for both strategies
//! 4. **Round trip** of detached entities
//!
//! Run with: cargo test -p chimera_core --test composition_properties

use chimera_core::{
    Fragment, Lookup, Member, Method, ModelConfig, ModelError, Realm, SealLevel, TemplateHandle,
    TemplateSpec, TemplateState, Value,
};

fn get_name() -> Method {
    Method::new(|me, _| Ok(me.value_or_null("name")))
}

fn person(realm: &Realm) -> TemplateHandle {
    realm
        .define_template(
            "person",
            TemplateSpec::new()
                .field("name", "default")
                .field("age", 0)
                .method("getName", get_name()),
        )
        .unwrap()
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[test]
fn maud_reads_her_own_name() {
    let realm = Realm::default();
    let person = person(&realm);

    let mut maud = realm
        .create_entity(&person, [("name", Value::from("maud")), ("age", Value::from(26))])
        .unwrap();

    assert_eq!(realm.resolve(&maud, "name").value(), Some(&Value::from("maud")));
    assert_eq!(maud.invoke("getName", &[]).unwrap(), Value::from("maud"));

    // The method was not copied into the entity
    assert!(maud.own("getName").is_none());
    assert!(!realm.resolve(&maud, "getName").is_own());
}

#[test]
fn own_field_shadows_template_field() {
    let realm = Realm::default();
    let person = person(&realm);
    let entity = realm.create_entity(&person, [("age", 40)]).unwrap();

    let lookup = realm.resolve(&entity, "age");
    assert!(lookup.is_own());
    assert_eq!(lookup.value(), Some(&Value::from(40)));
}

#[test]
fn nearer_template_wins_over_ancestor() {
    let realm = Realm::default();
    let animal = realm
        .define_template(
            "animal",
            TemplateSpec::new()
                .method("saySomething", Method::new(|me, _| {
                    Ok(Value::from(format!("hi, my name is {}", me.text("name")?)))
                })),
        )
        .unwrap();
    realm.freeze(&animal);

    let cat = realm
        .define_template(
            "cat",
            TemplateSpec::new()
                .parent("animal")
                .method("saySomething", Method::new(|me, _| {
                    Ok(Value::from(format!("Meow, my name is {}", me.text("name")?)))
                })),
        )
        .unwrap();

    let mut tom = realm.create_entity(&cat, [("name", "tom")]).unwrap();
    assert_eq!(
        tom.invoke("saySomething", &[]).unwrap(),
        Value::from("Meow, my name is tom")
    );

    match realm.resolve(&tom, "saySomething") {
        Lookup::Delegated { template, depth, .. } => {
            assert_eq!(template.name(), "cat");
            assert_eq!(depth, 1);
        }
        other => panic!("expected a delegated lookup, got {other:?}"),
    }
}

#[test]
fn removing_a_shadow_reveals_the_template() {
    let realm = Realm::default();
    let person = person(&realm);
    let mut entity = realm.create_entity(&person, [("name", "jo")]).unwrap();

    entity.remove("name");
    assert_eq!(entity.text("name").unwrap(), "default");
}

#[test]
fn methods_are_shared_not_copied() {
    let realm = Realm::default();
    let method = get_name();
    let person = realm
        .define_template("person", TemplateSpec::new().method("getName", method.clone()))
        .unwrap();

    let before = method.share_count();
    let crowd: Vec<_> = (0..100)
        .map(|i| realm.create_entity(&person, [("name", format!("p{i}"))]).unwrap())
        .collect();

    assert_eq!(method.share_count(), before);
    for entity in &crowd {
        assert!(realm.resolve(entity, "getName").method().unwrap().same_body(&method));
    }
}

// ============================================================================
// IMMUTABILITY
// ============================================================================

#[test]
fn frozen_template_rejects_writes_but_entities_still_shadow() {
    let realm = Realm::default();
    let person = person(&realm);
    let mut maud = realm.create_entity(&person, [("name", "maud")]).unwrap();

    assert_eq!(realm.freeze(&person), TemplateState::Published(SealLevel::Frozen));
    assert_eq!(realm.freeze(&person), TemplateState::Published(SealLevel::Frozen));

    let err = realm
        .write_template_member(&person, "name", Value::from("changed"))
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::WriteToFrozenTemplate {
            template: "person".to_string(),
            key: "name".to_string(),
            level: SealLevel::Frozen,
        }
    );
    assert!(realm.registry().remove_member(&person, "age").is_err());

    maud.set("age", 27);
    assert_eq!(maud.int("age").unwrap(), 27);
    assert_eq!(person.own("age"), Some(&Member::Field(Value::from(0))));
}

#[test]
fn sealed_template_accepts_overwrites_only() {
    let realm = Realm::default();
    let person = person(&realm);
    realm.seal(&person);

    let revised = realm
        .write_template_member(&person, "age", Value::from(18))
        .unwrap();
    assert_eq!(revised.own("age"), Some(&Member::Field(Value::from(18))));

    assert!(matches!(
        realm.write_template_member(&person, "height", Value::from(170)),
        Err(ModelError::WriteToFrozenTemplate { level: SealLevel::Sealed, .. })
    ));

    // Freezing tightens further; sealing again never loosens
    realm.freeze(&person);
    realm.seal(&person);
    assert_eq!(person.state(), TemplateState::Published(SealLevel::Frozen));
}

#[test]
fn entities_keep_the_revision_they_were_built_from() {
    let realm = Realm::default();
    let person = person(&realm);
    let old = realm.create_entity(&person, [("name", "old")]).unwrap();

    realm
        .write_template_member(&person, "species", Value::from("human"))
        .unwrap();
    let new = realm.create_entity(&person, [("name", "new")]).unwrap();

    assert!(!old.get("species").is_found());
    assert_eq!(new.text("species").unwrap(), "human");
}

// ============================================================================
// COMPOSITION
// ============================================================================

#[test]
fn last_fragment_wins() {
    let realm = Realm::default();
    let base = realm.create_detached_entity([("name", Value::from("base"))]);

    let composed = realm.compose(
        &base,
        [&Fragment::new().field("x", 1), &Fragment::new().field("x", 2)],
    );
    assert_eq!(realm.resolve(&composed, "x").value(), Some(&Value::from(2)));
}

#[test]
fn paladin_fights_and_casts_with_independent_state() {
    let realm = Realm::default();

    let fight = Method::new(|me, _| {
        let stamina = me.int("stamina")?;
        if stamina <= 0 {
            return Err(ModelError::InvalidArgument(format!(
                "{} has no stamina left",
                me.text("name")?
            )));
        }
        me.set("stamina", stamina - 1);
        Ok(Value::from(format!("{} is fighting", me.text("name")?)))
    });
    let cast = Method::new(|me, _| {
        let aura = me.int("aura")?;
        me.set("aura", aura - 1);
        Ok(Value::from(format!("{} is casting a spell", me.text("name")?)))
    });

    let fighter = Fragment::named("fighter").field("stamina", 1).method("fight", fight);
    let mage = Fragment::named("mage").field("aura", 100).method("cast", cast);

    let base = realm.create_detached_entity([
        ("name", Value::from("paladin1")),
        ("health", Value::from(100)),
    ]);
    let mut first = realm.compose(&base, [&fighter, &mage]);
    let second = realm.compose(&base, [&fighter, &mage]);

    assert_eq!(first.invoke("fight", &[]).unwrap(), Value::from("paladin1 is fighting"));
    assert_eq!(first.invoke("cast", &[]).unwrap(), Value::from("paladin1 is casting a spell"));
    assert!(matches!(first.invoke("fight", &[]), Err(ModelError::InvalidArgument(_))));

    assert_eq!(first.int("stamina").unwrap(), 0);
    assert_eq!(first.int("aura").unwrap(), 99);
    assert_eq!(second.int("stamina").unwrap(), 1);
    assert_eq!(second.int("aura").unwrap(), 100);
}

#[test]
fn chained_entities_share_templates_but_not_state() {
    let realm = Realm::default();
    let character = realm
        .define_template("character", TemplateSpec::new().field("health", 100))
        .unwrap();
    let fighter = realm
        .define_template("fighter", TemplateSpec::new().field("stamina", 100))
        .unwrap();
    let mage = realm
        .define_template("mage", TemplateSpec::new().field("aura", 100))
        .unwrap();

    let a = realm.create_entity(&character, [("name", "a")]).unwrap();
    let b = realm.create_entity(&character, [("name", "b")]).unwrap();
    let mut paladin_a = realm.compose_chained(&a, [&fighter, &mage]);
    let paladin_b = realm.compose_chained(&b, [&fighter, &mage]);

    assert!(TemplateHandle::ptr_eq(
        paladin_a.template().unwrap(),
        paladin_b.template().unwrap()
    ));

    paladin_a.set("stamina", 10);
    assert_eq!(paladin_a.int("stamina").unwrap(), 10);
    assert_eq!(paladin_b.int("stamina").unwrap(), 100);

    // The private chain is frozen
    let head = paladin_a.template().unwrap();
    assert_eq!(head.state(), TemplateState::Published(SealLevel::Frozen));
    assert!(realm
        .write_template_member(head, "stamina", Value::from(0))
        .is_err());
}

#[test]
fn chained_composition_order_matters() {
    let realm = Realm::default();
    let calm = realm
        .define_template("calm", TemplateSpec::new().field("mood", "calm"))
        .unwrap();
    let angry = realm
        .define_template("angry", TemplateSpec::new().field("mood", "angry"))
        .unwrap();
    let base = realm.create_detached_entity(Vec::<(String, Value)>::new());

    let one = realm.compose_chained(&base, [&calm, &angry]);
    let two = realm.compose_chained(&base, [&angry, &calm]);
    assert_eq!(one.text("mood").unwrap(), "angry");
    assert_eq!(two.text("mood").unwrap(), "calm");
}

// ============================================================================
// DETACHED ENTITIES
// ============================================================================

#[test]
fn detached_entity_round_trip() {
    let realm = Realm::default();
    let spec = vec![
        ("name".to_string(), Member::Field(Value::from("maud"))),
        ("age".to_string(), Member::Field(Value::from(26))),
        ("sayHi".to_string(), Member::Method(get_name())),
    ];
    let entity = realm.create_detached_entity(spec.clone());

    assert!(entity.is_detached());
    for (key, member) in &spec {
        assert_eq!(realm.resolve(&entity, key).member(), Some(member));
    }
    assert!(!realm.resolve(&entity, "species").is_found());
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn strict_realm_from_toml() {
    let config =
        ModelConfig::from_toml("strict_overrides = true\npublish_seal = \"sealed\"").unwrap();
    let realm = Realm::new(config);
    let person = person(&realm);

    assert!(matches!(
        realm.create_entity(&person, [("nickname", "mo")]),
        Err(ModelError::InvalidOverrideKey { .. })
    ));
    assert_eq!(person.state(), TemplateState::Draft);

    realm.create_entity(&person, [("name", "maud")]).unwrap();
    assert_eq!(person.state(), TemplateState::Published(SealLevel::Sealed));
}
