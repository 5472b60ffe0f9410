use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{bail, Context};
use cranpose_repeat::{CallbackSource, NodeId, RecyclableNode, RepeatCacheConfig, RepeatCaches};

const ITEM_COUNT: u64 = 10_000;
const VIEWPORT: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Template {
    Header,
    Text,
    Image,
}

#[derive(Clone, Debug)]
struct Item {
    id: u64,
    template: Template,
}

impl Item {
    fn new(id: u64) -> Self {
        let template = match id % 10 {
            0 => Template::Header,
            3 | 7 => Template::Image,
            _ => Template::Text,
        };
        Self { id, template }
    }
}

#[derive(Debug)]
struct ItemView {
    id: NodeId,
    template: Template,
    label: RefCell<String>,
    reuses: Cell<usize>,
}

impl RecyclableNode for ItemView {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn on_reuse(&self) {
        self.reuses.set(self.reuses.get() + 1);
        log::trace!("view #{} back on screen as {}", self.id, self.label.borrow());
    }

    fn on_recycle(&self) {
        log::trace!("view #{} parked ({})", self.id, self.label.borrow());
    }
}

type Feed = Rc<RefCell<Vec<Item>>>;
type DemoSource = CallbackSource<u64, Template, ItemView>;

fn slice(feed: &Feed, from: usize, to: usize) -> Vec<Item> {
    let items = feed.borrow();
    if from >= items.len() {
        return Vec::new();
    }
    items[from..=to.min(items.len() - 1)].to_vec()
}

fn label(item: &Item) -> String {
    format!("{:?} #{}", item.template, item.id)
}

fn make_source(feed: &Feed) -> DemoSource {
    let keys = Rc::clone(feed);
    let types = Rc::clone(feed);
    let build = Rc::clone(feed);
    let update = Rc::clone(feed);
    let next_id = Rc::new(Cell::new(0));

    CallbackSource::new(
        move |from, to| slice(&keys, from, to).iter().map(|item| item.id).collect(),
        move |from, to| {
            slice(&types, from, to)
                .iter()
                .map(|item| item.template)
                .collect()
        },
        move |index, sink| {
            let Some(item) = build.borrow().get(index).cloned() else {
                return;
            };
            next_id.set(next_id.get() + 1);
            sink.emit(ItemView {
                id: next_id.get(),
                template: item.template,
                label: RefCell::new(label(&item)),
                reuses: Cell::new(0),
            });
        },
        move |_old_key, index, view: &ItemView| {
            if let Some(item) = update.borrow().get(index) {
                *view.label.borrow_mut() = label(item);
            }
        },
    )
}

fn layout_pass(caches: &mut RepeatCaches<DemoSource>, first: usize) -> anyhow::Result<()> {
    let last = first + VIEWPORT - 1;
    caches.set_active_range(first, last);
    caches.recycle_out_of_range();
    for index in first..=last {
        let view = caches
            .get_or_create_node(index)
            .with_context(|| format!("laying out index {index}"))?
            .with_context(|| format!("index {index} is past the end of the feed"))?;
        let expected = caches.get_ttype(index, false);
        if expected != Some(view.template) {
            bail!(
                "view #{} has template {:?} but index {index} expects {expected:?}",
                view.id,
                view.template
            );
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "logging")]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let feed: Feed = Rc::new(RefCell::new((0..ITEM_COUNT).map(Item::new).collect()));
    let config = RepeatCacheConfig::new().with_cache_count(Template::Header, 2);
    let mut caches = RepeatCaches::with_config(make_source(&feed), config);

    println!("=== Cranpose repeat cache demo ===");
    println!("{ITEM_COUNT} items, {VIEWPORT} visible at a time");
    println!();

    // Steady fling down.
    for frame in 0..400 {
        layout_pass(&mut caches, frame * 5)?;
        if frame % 50 == 49 {
            caches.purge();
        }
    }
    caches.purge();
    let after_fling = caches.stats();
    println!("after fling:  {after_fling:?}");

    // Insert a batch right inside the viewport and relayout.
    let first = caches.active_range().map_or(0, |range| range.from);
    {
        let mut items = feed.borrow_mut();
        for offset in 0..3 {
            items.insert(first + 2, Item::new(ITEM_COUNT + offset));
        }
    }
    caches.invalidate();
    layout_pass(&mut caches, first)?;
    caches.purge();
    println!("after insert: {:?}", caches.stats());

    // Jump back to the top.
    layout_pass(&mut caches, 0)?;
    caches.purge();
    let stats = caches.stats();
    println!("after jump:   {stats:?}");
    println!();
    println!(
        "built {} views for {} layout requests, reused {} spares",
        stats.total_built,
        402 * VIEWPORT,
        stats.reuse_count
    );

    let mut most_reused: Option<(usize, String)> = None;
    caches.for_each_l1_node(|_, _, view| {
        let reuses = view.reuses.get();
        if most_reused.as_ref().map_or(true, |(best, _)| reuses > *best) {
            most_reused = Some((reuses, view.label.borrow().clone()));
        }
    });
    if let Some((reuses, label)) = most_reused {
        println!("busiest visible view: {label} (reused {reuses} times)");
    }

    println!();
    print!("{}", caches.dump());
    Ok(())
}
