use pretty_assertions::assert_eq;
use taxotree::model::taxonomy::{SUBSUMED_BY, SYNONYM};
use taxotree::event_log::Event;
use taxotree::{ContainerRedirect, EventLog, Flags, Interest, Rank, TaxonIndex, Taxonomy, TaxonomyConfig, TaxonomyError, Verdict};

/// Life → Bacteria → {Foo bar (species, 10), Foo (genus, 11)}
struct Fixture {
    tax: Taxonomy,
    life: TaxonIndex,
    bacteria: TaxonIndex,
    foo_bar: TaxonIndex,
    foo: TaxonIndex,
}

fn bacteria_fixture() -> Fixture {
    let mut tax = Taxonomy::new("test");
    let life = tax.new_taxon(Some("Life"));
    tax.add_root(life).unwrap();
    let bacteria = tax.new_taxon(Some("Bacteria"));
    tax.attach(life, bacteria).unwrap();
    tax.bind_id(bacteria, "2").unwrap();

    let foo_bar = tax.new_taxon(Some("Foo bar"));
    tax.set_rank(foo_bar, Rank::Species).unwrap();
    tax.bind_id(foo_bar, "10").unwrap();
    tax.attach(bacteria, foo_bar).unwrap();

    let foo = tax.new_taxon(Some("Foo"));
    tax.set_rank(foo, Rank::Genus).unwrap();
    tax.bind_id(foo, "11").unwrap();
    tax.attach(bacteria, foo).unwrap();

    Fixture {
        tax,
        life,
        bacteria,
        foo_bar,
        foo,
    }
}

/// Everything observable about the tree: dump records, counts and index sizes.
fn snapshot(tax: &Taxonomy) -> (Vec<taxotree::io::TaxonRecord>, Vec<usize>, usize) {
    let records = tax.taxon_records();
    let counts = tax.pre_order(tax.forest()).map(|t| tax.count(t)).collect();
    (records, counts, tax.registry().num_names())
}

fn sorted(mut nodes: Vec<TaxonIndex>) -> Vec<TaxonIndex> {
    nodes.sort();
    nodes
}

// ============= Structure =============

#[test]
fn test_building_taxonomy() {
    let f = bacteria_fixture();
    let tax = &f.tax;

    assert_eq!(tax.num_taxa(), 4);
    assert_eq!(tax.roots(), vec![f.life]);
    assert_eq!(tax[f.bacteria].parent(), Some(f.life));
    assert_eq!(sorted(tax[f.bacteria].children().to_vec()), sorted(vec![f.foo_bar, f.foo]));
    assert_eq!(tax.count(f.life), 4);
    assert_eq!(tax.count(f.bacteria), 3);
    assert_eq!(tax.depth(f.life), 1);
    assert_eq!(tax.depth(f.foo_bar), 3);
    assert_eq!(tax.lookup_id("10"), Some(f.foo_bar));
    assert_eq!(tax.taxa_named("Foo"), vec![f.foo]);
    assert!(tax.is_valid());
}

#[test]
fn test_traversal_orders() {
    let f = bacteria_fixture();
    let tax = &f.tax;

    let pre: Vec<TaxonIndex> = tax.pre_order(f.life).collect();
    assert_eq!(pre, vec![f.life, f.bacteria, f.foo_bar, f.foo]);
    let post: Vec<TaxonIndex> = tax.post_order(f.life).collect();
    assert_eq!(post, vec![f.foo_bar, f.foo, f.bacteria, f.life]);
    let ancestors: Vec<TaxonIndex> = tax.ancestors(f.foo).collect();
    assert_eq!(ancestors, vec![f.bacteria, f.life, tax.forest()]);
}

#[test]
fn test_attach_cycle_leaves_tree_unchanged() {
    let mut f = bacteria_fixture();
    let before = snapshot(&f.tax);

    let result = f.tax.reparent(f.life, f.foo_bar);
    assert_eq!(
        result,
        Err(TaxonomyError::Cycle {
            parent: f.foo_bar,
            child: f.life
        })
    );
    assert!(matches!(f.tax.reparent(f.bacteria, f.bacteria), Err(TaxonomyError::Cycle { .. })));

    f.tax.detach(f.bacteria).unwrap();
    assert!(matches!(f.tax.attach(f.foo, f.bacteria), Err(TaxonomyError::Cycle { .. })));
    f.tax.attach(f.life, f.bacteria).unwrap();

    assert_eq!(snapshot(&f.tax), before);
    assert!(f.tax.is_valid());
}

#[test]
fn test_forest_cannot_become_a_child() {
    let mut f = bacteria_fixture();
    let forest = f.tax.forest();
    let loose = f.tax.new_taxon(Some("Loose"));
    let before = snapshot(&f.tax);

    assert_eq!(
        f.tax.attach(loose, forest),
        Err(TaxonomyError::Cycle {
            parent: loose,
            child: forest
        })
    );
    assert!(matches!(f.tax.reparent(forest, loose), Err(TaxonomyError::Cycle { .. })));
    assert!(matches!(f.tax.reparent(forest, f.foo), Err(TaxonomyError::Cycle { .. })));
    assert_eq!(f.tax[forest].parent(), None);
    assert_eq!(snapshot(&f.tax), before);

    // The loose taxon is still free to go anywhere
    f.tax.attach(f.bacteria, loose).unwrap();
    assert_eq!(f.tax[loose].parent(), Some(f.bacteria));
    assert!(f.tax.is_valid());
}

#[test]
fn test_prune_records_no_information() {
    let interest = Interest {
        names: ["Foo".to_string()].into_iter().collect(),
        min_size: usize::MAX,
    };
    let mut tax = Taxonomy::new("test").with_event_log(EventLog::new(interest));
    let life = tax.new_taxon(Some("Life"));
    tax.add_root(life).unwrap();
    let foo = tax.new_taxon(Some("Foo"));
    tax.attach(life, foo).unwrap();
    let foo_bar = tax.new_taxon(Some("Foo bar"));
    tax.attach(foo, foo_bar).unwrap();

    assert_eq!(tax.prune(foo, "merged away").unwrap(), 2);
    assert_eq!(tax.event_log().tally("prune"), 2);

    let kept: Vec<&Event> = tax.event_log().events_of("prune").collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name.as_deref(), Some("Foo"));
    assert_eq!(kept[0].size, 2);
    assert_eq!(kept[0].verdict, Verdict::NoInformation);

    let json = serde_json::to_value(kept[0]).unwrap();
    assert_eq!(json["kind"], "prune");
    assert_eq!(json["detail"], "merged away");
    assert_eq!(json["size"], 2);
}

#[test]
fn test_attach_requires_detached_child() {
    let mut f = bacteria_fixture();
    let result = f.tax.attach(f.life, f.foo);
    assert_eq!(
        result,
        Err(TaxonomyError::AlreadyAttached {
            child: f.foo,
            parent: f.bacteria
        })
    );
}

#[test]
fn test_foreign_taxonomy_is_rejected() {
    let mut f = bacteria_fixture();
    let mut other = Taxonomy::new("other");
    let stranger = other.new_taxon(Some("Stranger"));

    assert_eq!(f.tax.attach(f.life, stranger), Err(TaxonomyError::ForeignTaxonomy(stranger)));
    assert!(f.tax.get(stranger).is_none());
    assert!(f.tax.mrca(f.life, stranger).is_err());
    assert!(other.attach(stranger, f.foo).is_err());
}

#[test]
#[should_panic]
fn test_index_with_foreign_handle_panics() {
    let f = bacteria_fixture();
    let mut other = Taxonomy::new("other");
    let stranger = other.new_taxon(Some("Stranger"));
    let _ = &f.tax[stranger];
}

#[test]
fn test_detach_then_attach_restores_counts() {
    let mut f = bacteria_fixture();
    let children_before = sorted(f.tax[f.bacteria].children().to_vec());
    let (life_count, bacteria_count) = (f.tax.count(f.life), f.tax.count(f.bacteria));

    f.tax.detach(f.foo).unwrap();
    assert_eq!(f.tax[f.foo].parent(), None);
    assert_eq!(f.tax.count(f.life), life_count - 1);
    assert_eq!(f.tax.count(f.bacteria), bacteria_count - 1);
    f.tax.detach(f.foo).unwrap(); // no-op

    f.tax.attach(f.bacteria, f.foo).unwrap();
    assert_eq!(sorted(f.tax[f.bacteria].children().to_vec()), children_before);
    assert_eq!(f.tax.count(f.life), life_count);
    assert_eq!(f.tax.count(f.bacteria), bacteria_count);
    assert!(f.tax.is_valid());
}

#[test]
fn test_reparent_invalidates_depths() {
    let mut f = bacteria_fixture();
    assert_eq!(f.tax.depth(f.foo_bar), 3);
    f.tax.reparent(f.foo_bar, f.life).unwrap();
    assert_eq!(f.tax.depth(f.foo_bar), 2);
    assert_eq!(f.tax.count(f.bacteria), 2);
    assert!(f.tax.validate().is_empty());
}

#[test]
fn test_reparent_with_flags_replaces_incertae_sedis() {
    let mut f = bacteria_fixture();
    f.tax.add_flags(f.foo, Flags::UNCLASSIFIED | Flags::EXTINCT).unwrap();
    f.tax.reparent_with_flags(f.foo, f.life, Flags::INCERTAE_SEDIS).unwrap();

    let flags = f.tax[f.foo].proper_flags();
    assert!(flags.contains(Flags::INCERTAE_SEDIS | Flags::EXTINCT));
    assert!(!flags.contains(Flags::UNCLASSIFIED));
}

// ============= Pruning =============

#[test]
fn test_prune_scenario() {
    let mut f = bacteria_fixture();
    let before = f.tax.count(f.life);

    assert_eq!(f.tax.prune(f.foo, "test").unwrap(), 1);

    assert_eq!(f.tax[f.foo_bar].parent(), Some(f.bacteria));
    assert_eq!(f.tax.lookup_id("11"), None);
    assert_eq!(f.tax.lookup_id("10"), Some(f.foo_bar));
    assert!(f.tax.taxa_named("Foo").is_empty());
    assert!(f.tax[f.foo].is_pruned());
    assert_eq!(f.tax.count(f.life), before - 1);
    assert!(f.tax.is_valid());
}

#[test]
fn test_prune_subtree_and_idempotence() {
    let mut f = bacteria_fixture();
    let baz = f.tax.new_taxon(Some("Foo baz"));
    f.tax.bind_id(baz, "12").unwrap();
    f.tax.attach(f.foo, baz).unwrap();
    f.tax.new_synonym(baz, "Foo bazz", "misspelling", Vec::new()).unwrap();
    let before = f.tax.count(f.bacteria);

    assert_eq!(f.tax.prune(f.foo, "test").unwrap(), 2);
    assert_eq!(f.tax.prune(f.foo, "test").unwrap(), 0);

    assert_eq!(f.tax.lookup_id("12"), None);
    assert!(f.tax.lookup_name("Foo baz").is_empty());
    assert!(f.tax.lookup_name("Foo bazz").is_empty());
    assert_eq!(f.tax.count(f.bacteria), before - 2);
    assert_eq!(f.tax.event_log().tally("prune"), 2);
    assert!(f.tax.is_valid());
}

#[test]
fn test_pruned_taxon_is_read_only() {
    let mut f = bacteria_fixture();
    f.tax.prune(f.foo, "test").unwrap();

    assert_eq!(f.tax.attach(f.life, f.foo), Err(TaxonomyError::PrunedTaxon(f.foo)));
    assert_eq!(f.tax.rename(f.foo, Some("Bar")), Err(TaxonomyError::PrunedTaxon(f.foo)));
    assert_eq!(f.tax[f.foo].name(), Some("Foo"));
}

#[test]
fn test_prune_forest_prunes_everything() {
    let mut f = bacteria_fixture();
    let forest = f.tax.forest();
    assert_eq!(f.tax.prune(forest, "reset").unwrap(), 4);
    assert_eq!(f.tax.num_taxa(), 0);
    assert_eq!(f.tax.registry().num_names(), 0);
}

// ============= Names and ids =============

#[test]
fn test_id_collision_keeps_existing_binding() {
    let mut f = bacteria_fixture();
    let result = f.tax.bind_id(f.foo_bar, "11");
    assert_eq!(
        result,
        Err(TaxonomyError::IdCollision {
            id: "11".to_string(),
            existing: f.foo
        })
    );
    assert_eq!(f.tax[f.foo_bar].id(), Some("10"));
    assert_eq!(f.tax.lookup_id("11"), Some(f.foo));
    assert_eq!(f.tax.event_log().tally("id-collision"), 1);

    // Pruned taxa release their ids
    f.tax.prune(f.foo, "test").unwrap();
    f.tax.bind_id(f.foo_bar, "11").unwrap();
    assert_eq!(f.tax.lookup_id("11"), Some(f.foo_bar));
    assert_eq!(f.tax.lookup_id("10"), None);
}

#[test]
fn test_rename_updates_name_index() {
    let mut f = bacteria_fixture();
    f.tax.rename(f.foo, Some("Fooia")).unwrap();
    assert!(f.tax.taxa_named("Foo").is_empty());
    assert_eq!(f.tax.taxa_named("Fooia"), vec![f.foo]);

    f.tax.rename(f.foo, None).unwrap();
    assert!(f.tax.taxa_named("Fooia").is_empty());
    assert!(f.tax.is_valid());
}

#[test]
fn test_aliases() {
    let mut f = bacteria_fixture();
    f.tax.add_alias("99", f.foo).unwrap();
    assert_eq!(f.tax.lookup_id("99"), Some(f.foo));
    assert!(matches!(
        f.tax.add_alias("10", f.foo),
        Err(TaxonomyError::IdCollision { .. })
    ));
    assert_eq!(f.tax.forward_records(), vec![("99".to_string(), "11".to_string())]);
}

#[test]
fn test_synonyms_are_deduplicated() {
    let mut f = bacteria_fixture();
    let a = f.tax.new_synonym(f.foo, "Fooa", "synonym", Vec::new()).unwrap();
    let b = f.tax.new_synonym(f.foo, "Fooa", "synonym", Vec::new()).unwrap();
    let c = f.tax.new_synonym(f.foo, "Fooa", "misspelling", Vec::new()).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(f.tax[f.foo].synonyms().len(), 2);
    assert_eq!(f.tax.bearers("Fooa"), vec![f.foo]);
}

#[test]
fn test_derived_flags_cannot_be_added() {
    let mut f = bacteria_fixture();
    f.tax.add_flags(f.foo, Flags::BARREN | Flags::HIDDEN).unwrap();
    assert_eq!(f.tax[f.foo].proper_flags(), Flags::HIDDEN);
    assert!(f.tax[f.foo].is_hidden());

    f.tax.add_flags(f.foo, Flags::FORCED_VISIBLE).unwrap();
    assert!(!f.tax[f.foo].is_hidden());
    f.tax.remove_flags(f.foo, Flags::FORCED_VISIBLE).unwrap();
    assert!(f.tax[f.foo].is_hidden());
}

// ============= Elide and absorb =============

/// Life → A → B → {c1, c2}
fn chain() -> (Taxonomy, [TaxonIndex; 5]) {
    let mut tax = Taxonomy::new("chain");
    let life = tax.new_taxon(Some("life"));
    tax.add_root(life).unwrap();
    let a = tax.new_taxon(Some("A"));
    tax.attach(life, a).unwrap();
    let b = tax.new_taxon(Some("B"));
    tax.attach(a, b).unwrap();
    let c1 = tax.new_taxon(Some("c1"));
    tax.attach(b, c1).unwrap();
    let c2 = tax.new_taxon(Some("c2"));
    tax.attach(b, c2).unwrap();
    (tax, [life, a, b, c1, c2])
}

#[test]
fn test_elide_only_child_leaves_subsumed_synonym() {
    let (mut tax, [_, a, b, c1, c2]) = chain();
    tax.elide(b, true).unwrap();

    assert_eq!(sorted(tax[a].children().to_vec()), sorted(vec![c1, c2]));
    assert!(tax[b].is_pruned());
    assert_eq!(tax.bearers("B"), vec![a]);
    let synonym = tax.synonym(tax[a].synonyms()[0]);
    assert_eq!(synonym.kind(), SUBSUMED_BY);
    assert!(!tax[c1].proper_flags().contains(Flags::UNPLACED));
    assert!(tax.is_valid());
}

#[test]
fn test_elide_unplaced_flags_children() {
    let (mut tax, [_, _, b, c1, c2]) = chain();
    tax.elide(b, false).unwrap();
    assert!(tax[c1].proper_flags().contains(Flags::UNPLACED));
    assert!(tax[c2].proper_flags().contains(Flags::UNPLACED));
}

#[test]
fn test_elide_detached_fails() {
    let mut tax = Taxonomy::new("test");
    let loner = tax.new_taxon(Some("Loner"));
    assert_eq!(tax.elide(loner, true), Err(TaxonomyError::Detached(loner)));
}

#[test]
fn test_absorb_merges_children_synonyms_and_ids() {
    let (mut tax, [life, a, b, c1, _]) = chain();
    let other = tax.new_taxon(Some("Other"));
    tax.attach(life, other).unwrap();
    tax.bind_id(other, "5").unwrap();
    tax.new_synonym(other, "Otherella", "synonym", Vec::new()).unwrap();
    let child = tax.new_taxon(Some("child"));
    tax.attach(other, child).unwrap();

    tax.absorb(a, other).unwrap();

    assert_eq!(tax[child].parent(), Some(a));
    assert!(tax[other].is_pruned());
    assert_eq!(tax.lookup_id("5"), Some(a));
    assert_eq!(tax.bearers("Other"), vec![a]);
    assert_eq!(tax.bearers("Otherella"), vec![a]);
    let kinds: Vec<&str> = tax[a].synonyms().iter().map(|s| tax.synonym(*s).kind()).collect();
    assert!(kinds.contains(&SYNONYM));
    assert_eq!(tax.event_log().tally("absorb"), 1);

    assert!(matches!(tax.absorb(c1, b), Err(TaxonomyError::Cycle { .. })));
    assert!(tax.is_valid());
}

// ============= Roots and containers =============

#[test]
fn test_add_root_marks_all_but_top_name_unplaced() {
    let mut tax = Taxonomy::new("test");
    let life = tax.new_taxon(Some("life"));
    let stray = tax.new_taxon(Some("Stray"));
    tax.add_root(life).unwrap();
    tax.add_root(stray).unwrap();

    assert!(!tax[life].is_unplaced());
    assert!(tax[stray].is_unplaced());
    assert_eq!(tax[stray].parent(), Some(tax.forest()));
}

/// life → Eukaryota (division) → Fungi → "Fungi incertae sedis" (emptied)
fn container_fixture(policy: ContainerRedirect) -> (Taxonomy, TaxonIndex, TaxonIndex, TaxonIndex) {
    let config = TaxonomyConfig {
        container_redirect: policy,
        ..TaxonomyConfig::default()
    };
    let mut tax = Taxonomy::new("test").with_config(config);
    let life = tax.new_taxon(Some("life"));
    tax.add_root(life).unwrap();
    let eukaryota = tax.new_taxon(Some("Eukaryota"));
    tax.attach(life, eukaryota).unwrap();
    tax.mark_division(eukaryota).unwrap();
    let fungi = tax.new_taxon(Some("Fungi"));
    tax.attach(eukaryota, fungi).unwrap();
    let container = tax.new_taxon(Some("Fungi incertae sedis"));
    tax.attach(fungi, container).unwrap();
    tax.add_flags(container, Flags::WAS_CONTAINER).unwrap();
    (tax, eukaryota, fungi, container)
}

#[test]
fn test_attach_to_former_container_goes_to_division() {
    let (mut tax, eukaryota, _, container) = container_fixture(ContainerRedirect::DivisionThenParent);
    let late = tax.new_taxon(Some("Latecomer"));

    assert_eq!(tax.attach(container, late).unwrap(), eukaryota);
    assert_eq!(tax[late].parent(), Some(eukaryota));
    assert!(tax[container].is_leaf());
    assert!(tax[late].proper_flags().contains(Flags::UNPLACED));
    assert_eq!(tax.event_log().tally("container-redirect"), 1);
}

#[test]
fn test_attach_to_former_container_goes_to_parent() {
    let (mut tax, _, fungi, container) = container_fixture(ContainerRedirect::ParentOnly);
    let late = tax.new_taxon(Some("Latecomer"));

    assert_eq!(tax.attach(container, late).unwrap(), fungi);
    assert!(tax[late].is_unplaced());
}

#[test]
fn test_container_without_division_falls_back_to_parent() {
    let mut tax = Taxonomy::new("test");
    let life = tax.new_taxon(Some("life"));
    tax.add_root(life).unwrap();
    let container = tax.new_taxon(Some("unclassified life"));
    tax.attach(life, container).unwrap();
    tax.add_flags(container, Flags::MERGED).unwrap();

    let late = tax.new_taxon(Some("Latecomer"));
    assert_eq!(tax.attach(container, late).unwrap(), life);
}

#[test]
fn test_division_cache() {
    let (mut tax, eukaryota, fungi, container) = container_fixture(ContainerRedirect::default());
    assert_eq!(tax.division(container), Some(eukaryota));
    assert_eq!(tax.division(eukaryota), Some(eukaryota));

    tax.mark_division(fungi).unwrap();
    assert_eq!(tax.division(container), Some(fungi));

    tax.reparent(container, eukaryota).unwrap();
    assert_eq!(tax.division(container), Some(eukaryota));
}
