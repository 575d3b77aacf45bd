use core::time::Duration;
use std::{cell::Cell, rc::Rc};
use xylem::{component, element, memory::MemoryHost, Component, Config, Engine, Slice, Timeout, Unbounded, UnitBudget, VirtualNode};

fn app(renders: &Rc<Cell<usize>>) -> VirtualNode {
	let renders = Rc::clone(renders);
	let app = Component::new(move |_, _| {
		renders.set(renders.get() + 1);
		Ok(vec![element("div").child(element("h1").child("Title")).child(element("p").child("Body")).build()])
	});
	component(&app).build()
}

fn start(vdom: VirtualNode) -> Engine<MemoryHost> {
	let mut engine = Engine::new(MemoryHost::new());
	let container = engine.host().container();
	engine.render(vdom, container);
	engine
}

#[test]
fn sliced_pass_matches_an_uninterrupted_one() {
	let renders = Rc::new(Cell::new(0));
	let mut sliced = start(app(&renders));

	let mut slices = 0;
	let mut performed_total = 0;
	let mutations = loop {
		slices += 1;
		match sliced.work_loop(&UnitBudget::new(1)).unwrap() {
			Slice::Yielded { performed } => {
				assert_eq!(performed, 1);
				performed_total += performed;
				assert_eq!(sliced.host().markup(), "");
				assert!(sliced.has_pending_work());
			}
			Slice::Committed { performed, mutations } => {
				performed_total += performed;
				break mutations;
			}
			Slice::Idle => panic!("idle before the pass committed"),
		}
	};
	// Root, App, div, h1, its text, p, its text.
	assert_eq!(performed_total, 7);
	assert_eq!(slices, 7);
	assert_eq!(mutations, 5);
	assert_eq!(renders.get(), 1);

	let mut direct = start(app(&Rc::new(Cell::new(0))));
	assert_eq!(direct.work_loop(&Unbounded).unwrap(), Slice::Committed { performed: 7, mutations: 5 });

	assert_eq!(sliced.host().ops(), direct.host().ops());
	assert_eq!(sliced.host().markup(), direct.host().markup());
	assert_eq!(sliced.host().markup(), "<div><h1>Title</h1><p>Body</p></div>");
}

#[test]
fn idle_without_work() {
	let mut engine = Engine::new(MemoryHost::new());
	assert!(!engine.has_pending_work());
	assert_eq!(engine.work_loop(&Unbounded).unwrap(), Slice::Idle);
	assert_eq!(engine.run_until_idle().unwrap(), 0);

	let container = engine.host().container();
	engine.render(element("p").build(), container);
	assert_eq!(engine.run_until_idle().unwrap(), 1);
	assert_eq!(engine.work_loop(&UnitBudget::new(1)).unwrap(), Slice::Idle);
}

#[test]
fn render_during_a_pass_is_queued() {
	let mut engine = start(element("div").child(element("p").child("first")).build());
	assert!(matches!(engine.work_loop(&UnitBudget::new(1)).unwrap(), Slice::Yielded { .. }));

	let container = engine.host().container();
	engine.render(element("div").child(element("p").child("second")).build(), container);
	engine.render(element("div").child(element("p").child("third")).build(), container);
	assert_eq!(engine.host().markup(), "");

	assert!(matches!(engine.work_loop(&Unbounded).unwrap(), Slice::Committed { .. }));
	assert_eq!(engine.host().markup(), "<div><p>first</p></div>");
	assert!(engine.has_pending_work());

	assert_eq!(engine.run_until_idle().unwrap(), 1);
	assert_eq!(engine.host().markup(), "<div><p>third</p></div>");
}

#[test]
fn zero_threshold_never_yields() {
	let mut engine = Engine::with_config(MemoryHost::new(), Config::default().with_yield_threshold(Duration::ZERO));
	assert_eq!(engine.config().yield_threshold, Duration::ZERO);
	let container = engine.host().container();
	engine.render(element("div").child(element("p")).build(), container);
	assert_eq!(engine.work_loop(&UnitBudget::new(1)).unwrap(), Slice::Committed { performed: 3, mutations: 2 });
}

#[test]
fn generous_timeout_finishes_in_one_slice() {
	let mut engine = start(element("div").child(element("p")).build());
	assert!(matches!(engine.work_loop(&Timeout::after(Duration::from_secs(60))).unwrap(), Slice::Committed { .. }));
	assert_eq!(engine.host().markup(), "<div><p></p></div>");
}

#[test]
fn expired_timeout_still_makes_progress() {
	let renders = Rc::new(Cell::new(0));
	let mut engine = start(app(&renders));
	let mut slices = 0;
	while engine.has_pending_work() {
		slices += 1;
		let _ = engine.work_loop(&Timeout::after(Duration::ZERO)).unwrap();
	}
	assert_eq!(slices, 7);
	assert_eq!(renders.get(), 1);
}
