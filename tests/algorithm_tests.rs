use pretty_assertions::assert_eq;
use std::cmp::Ordering;
use taxotree::algo::{NameQuery, Resolution};
use taxotree::model::taxonomy::SYNONYM;
use taxotree::{QualifiedId, Rank, TaxonIndex, Taxonomy, TaxonomyError};

fn add(tax: &mut Taxonomy, parent: TaxonIndex, name: &str, rank: Rank, id: Option<&str>) -> TaxonIndex {
    let node = tax.new_taxon(Some(name));
    tax.set_rank(node, rank).unwrap();
    if let Some(id) = id {
        tax.bind_id(node, id).unwrap();
    }
    tax.attach(parent, node).unwrap();
    node
}

/// Two plant genera and one bird genus named Morus:
/// ```text
/// life
/// └── Eukaryota
///     ├── Plantae (division)
///     │   ├── Rosaceae ── Morus [1]
///     │   └── Moraceae ── Morus [2] ── Morus alba
///     └── Animalia (division)
///         └── Sulidae ── Morus [3]
/// ```
struct Mulberries {
    tax: Taxonomy,
    life: TaxonIndex,
    plantae: TaxonIndex,
    animalia: TaxonIndex,
    rosaceae: TaxonIndex,
    moraceae: TaxonIndex,
    morus_rosaceae: TaxonIndex,
    morus_moraceae: TaxonIndex,
    morus_alba: TaxonIndex,
    morus_bird: TaxonIndex,
}

fn mulberries() -> Mulberries {
    let mut tax = Taxonomy::new("test");
    let life = tax.new_taxon(Some("life"));
    tax.add_root(life).unwrap();
    let eukaryota = add(&mut tax, life, "Eukaryota", Rank::Domain, None);
    let plantae = add(&mut tax, eukaryota, "Plantae", Rank::Kingdom, None);
    let animalia = add(&mut tax, eukaryota, "Animalia", Rank::Kingdom, None);
    tax.mark_division(plantae).unwrap();
    tax.mark_division(animalia).unwrap();

    let rosaceae = add(&mut tax, plantae, "Rosaceae", Rank::Family, None);
    let moraceae = add(&mut tax, plantae, "Moraceae", Rank::Family, None);
    let morus_rosaceae = add(&mut tax, rosaceae, "Morus", Rank::Genus, Some("1"));
    let morus_moraceae = add(&mut tax, moraceae, "Morus", Rank::Genus, Some("2"));
    let morus_alba = add(&mut tax, morus_moraceae, "Morus alba", Rank::Species, None);
    let sulidae = add(&mut tax, animalia, "Sulidae", Rank::Family, None);
    let morus_bird = add(&mut tax, sulidae, "Morus", Rank::Genus, Some("3"));

    Mulberries {
        tax,
        life,
        plantae,
        animalia,
        rosaceae,
        moraceae,
        morus_rosaceae,
        morus_moraceae,
        morus_alba,
        morus_bird,
    }
}

// ============= MRCA and divergence =============

#[test]
fn test_mrca() {
    let m = mulberries();
    let tax = &m.tax;
    assert_eq!(tax.mrca(m.morus_rosaceae, m.morus_alba).unwrap(), Some(m.plantae));
    assert_eq!(tax.mrca(m.morus_alba, m.morus_moraceae).unwrap(), Some(m.morus_moraceae));
    assert_eq!(tax.mrca(m.morus_alba, m.morus_alba).unwrap(), Some(m.morus_alba));
    assert_eq!(tax.mrca(m.morus_bird, m.life).unwrap(), Some(m.life));
}

#[test]
fn test_mrca_is_deepest_common_ancestor() {
    let m = mulberries();
    let tax = &m.tax;
    let all: Vec<TaxonIndex> = tax.pre_order(tax.forest()).collect();
    for &a in &all {
        for &b in &all {
            let mrca = tax.mrca(a, b).unwrap().expect("one tree");
            assert!(tax.is_ancestor_or_self(mrca, a));
            assert!(tax.is_ancestor_or_self(mrca, b));
            for &child in tax[mrca].children() {
                assert!(!(tax.is_ancestor_or_self(child, a) && tax.is_ancestor_or_self(child, b)));
            }
            assert_eq!(tax.mrca(b, a).unwrap(), Some(mrca));
        }
    }
}

#[test]
fn test_mrca_of_detached_taxon() {
    let mut m = mulberries();
    let loose = m.tax.new_taxon(Some("Loose"));
    assert_eq!(m.tax.mrca(loose, m.morus_alba).unwrap(), None);
    assert_eq!(m.tax.divergence(loose, m.morus_alba).unwrap(), None);
}

#[test]
fn test_mrca_across_taxonomies() {
    let m = mulberries();
    let mut other = Taxonomy::new("other");
    let stranger = other.new_taxon(Some("Morus"));
    assert_eq!(
        m.tax.mrca(m.morus_alba, stranger),
        Err(TaxonomyError::ForeignTaxonomy(stranger))
    );
    assert!(m.tax.divergence(stranger, m.morus_alba).is_err());
}

#[test]
fn test_divergence() {
    let m = mulberries();
    let tax = &m.tax;
    assert_eq!(
        tax.divergence(m.morus_rosaceae, m.morus_moraceae).unwrap(),
        Some((m.rosaceae, m.moraceae))
    );
    assert_eq!(
        tax.divergence(m.morus_alba, m.morus_rosaceae).unwrap(),
        Some((m.moraceae, m.rosaceae))
    );
    assert_eq!(
        tax.divergence(m.morus_alba, m.morus_bird).unwrap(),
        Some((m.plantae, m.animalia))
    );
}

#[test]
fn test_no_divergence() {
    let m = mulberries();
    let tax = &m.tax;
    // Containment either way
    assert_eq!(tax.divergence(m.morus_alba, m.plantae).unwrap(), None);
    assert_eq!(tax.divergence(m.plantae, m.morus_alba).unwrap(), None);
    // Same taxon, siblings
    assert_eq!(tax.divergence(m.morus_alba, m.morus_alba).unwrap(), None);
    assert_eq!(tax.divergence(m.rosaceae, m.moraceae).unwrap(), None);
}

// ============= Homonyms =============

#[test]
fn test_compare_taxa() {
    let m = mulberries();
    let tax = &m.tax;
    // More children first
    assert_eq!(tax.compare_taxa(m.morus_moraceae, m.morus_rosaceae), Ordering::Less);
    // Then smaller id
    assert_eq!(tax.compare_taxa(m.morus_rosaceae, m.morus_bird), Ordering::Less);
    assert_eq!(tax.compare_taxa(m.morus_bird, m.morus_bird), Ordering::Equal);
}

#[test]
fn test_resolve() {
    let m = mulberries();
    let tax = &m.tax;

    assert_eq!(tax.resolve(&NameQuery::new("Morus")), Resolution::Unique(m.morus_moraceae));
    assert_eq!(
        tax.resolve(&NameQuery::new("Morus").with_division(m.animalia)),
        Resolution::Unique(m.morus_bird)
    );
    assert_eq!(
        tax.resolve(&NameQuery::new("Morus").with_division(m.plantae)),
        Resolution::Unique(m.morus_moraceae)
    );
    assert_eq!(
        tax.resolve(&NameQuery::new("Morus").with_id("1")).unique(),
        Some(m.morus_rosaceae)
    );
    // Every bearer has another id
    assert_eq!(tax.resolve(&NameQuery::new("Morus").with_id("99")), Resolution::NotFound);
    assert_eq!(tax.resolve(&NameQuery::new("Ficus")), Resolution::NotFound);
}

#[test]
fn test_resolve_by_source() {
    let mut m = mulberries();
    let gbif = QualifiedId::new("gbif", "2984545");
    m.tax.add_source(m.morus_bird, gbif.clone()).unwrap();

    let query = NameQuery::new("Morus").with_source(&gbif);
    assert_eq!(m.tax.resolve(&query), Resolution::Unique(m.morus_bird));

    // A source reference nobody was built from does not filter
    let other = QualifiedId::new("gbif", "1");
    let query = NameQuery::new("Morus").with_source(&other);
    assert_eq!(m.tax.resolve(&query), Resolution::Unique(m.morus_moraceae));
}

#[test]
fn test_resolve_through_synonym() {
    let mut m = mulberries();
    m.tax.new_synonym(m.morus_alba, "Morus alba var. alba", SYNONYM, Vec::new()).unwrap();
    assert_eq!(
        m.tax.resolve(&NameQuery::new("Morus alba var. alba")),
        Resolution::Unique(m.morus_alba)
    );
    assert_eq!(m.tax.lookup_unique("Morus alba var. alba").unwrap(), None);
}

#[test]
fn test_resolve_ambiguous() {
    let mut tax = Taxonomy::new("test");
    let life = tax.new_taxon(Some("life"));
    tax.add_root(life).unwrap();
    let a = add(&mut tax, life, "A", Rank::NoRank, None);
    let b = add(&mut tax, life, "B", Rank::NoRank, None);
    let x1 = add(&mut tax, a, "X", Rank::NoRank, None);
    let x2 = add(&mut tax, b, "X", Rank::NoRank, None);

    assert_eq!(tax.resolve(&NameQuery::new("X")), Resolution::Ambiguous(vec![x1, x2]));
    assert_eq!(tax.resolve(&NameQuery::new("X")).unique(), None);
}

#[test]
fn test_lookup_unique() {
    let m = mulberries();
    assert_eq!(m.tax.lookup_unique("Morus alba").unwrap(), Some(m.morus_alba));
    assert_eq!(m.tax.lookup_unique("Ficus").unwrap(), None);
    match m.tax.lookup_unique("Morus") {
        Err(TaxonomyError::AmbiguousName { name, candidates }) => {
            assert_eq!(name, "Morus");
            assert_eq!(candidates, vec![m.morus_rosaceae, m.morus_moraceae, m.morus_bird]);
        }
        other => panic!("expected an ambiguity, got {other:?}"),
    }
}

#[test]
fn test_unique_name() {
    let m = mulberries();
    let tax = &m.tax;
    assert_eq!(tax.unique_name(m.morus_rosaceae), "Morus (genus in Rosaceae)");
    assert_eq!(tax.unique_name(m.morus_moraceae), "Morus (genus in Moraceae)");
    assert_eq!(tax.unique_name(m.morus_bird), "Morus (genus in Sulidae)");
    assert_eq!(tax.unique_name(m.morus_alba), "");
}

#[test]
fn test_unique_name_falls_back_to_id() {
    let mut tax = Taxonomy::new("test");
    let life = tax.new_taxon(Some("life"));
    tax.add_root(life).unwrap();
    let outer = add(&mut tax, life, "Nested", Rank::NoRank, Some("7"));
    let inner = add(&mut tax, outer, "Nested", Rank::NoRank, None);
    tax.add_source(inner, QualifiedId::new("ncbi", "42")).unwrap();

    // Every ancestor of the inner one contains the outer one
    assert_eq!(tax.unique_name(inner), "Nested (ncbi:42)");
    assert_eq!(tax.unique_name(outer), "Nested (id 7)");
}
