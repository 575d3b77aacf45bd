use std::{cell::Cell, rc::Rc};
use xylem::{component, element, memory::MemoryHost, Component, Engine, Error, Invariant, Slice, Unbounded, VirtualNode};

fn render(engine: &mut Engine<MemoryHost>, vdom: VirtualNode) -> Result<usize, Error> {
	let container = engine.host().container();
	engine.render(vdom, container);
	engine.run_until_idle()
}

#[test]
fn host_failure_during_render_discards_the_pass() {
	let mut engine = Engine::new(MemoryHost::new());
	render(&mut engine, element("div").child(element("p").child("a")).build()).unwrap();
	let before = engine.host().markup();
	let current = engine.current_root();

	engine.host_mut().fail_next("create_node");
	let error = render(&mut engine, element("div").child(element("p").child("a")).child(element("span")).build()).unwrap_err();
	match error {
		Error::Host(error) => assert_eq!(error.operation(), "create_node"),
		other => panic!("unexpected error: {other}"),
	}
	assert_eq!(engine.host().markup(), before);
	assert_eq!(engine.current_root(), current);
	assert!(engine.wip_root().is_none());
	assert!(engine.pending_deletions().is_empty());
	assert!(!engine.is_poisoned());

	render(&mut engine, element("div").child(element("p").child("b")).child(element("span")).build()).unwrap();
	assert_eq!(engine.host().markup(), "<div><p>b</p><span></span></div>");
}

#[test]
fn host_failure_on_first_render() {
	let mut engine = Engine::new(MemoryHost::new());
	engine.host_mut().fail_next("set_attribute");
	assert!(matches!(render(&mut engine, element("p").attr("id", "x").build()), Err(Error::Host(_))));
	assert!(engine.current_root().is_none());
	assert!(!engine.has_pending_work());
	assert_eq!(engine.host().markup(), "");

	assert_eq!(render(&mut engine, element("p").attr("id", "x").build()).unwrap(), 1);
	assert_eq!(engine.host().markup(), r#"<p id="x"></p>"#);
}

#[test]
fn render_function_failure() {
	let broken = Component::new(|_, _| Err("boom".into()));
	let mut engine = Engine::new(MemoryHost::new());

	let error = render(&mut engine, element("main").child(component(&broken)).build()).unwrap_err();
	match &error {
		Error::Render { source, .. } => assert_eq!(source.to_string(), "boom"),
		other => panic!("unexpected error: {other}"),
	}
	assert!(error.to_string().ends_with("failed: boom"));
	assert_eq!(engine.host().markup(), "");
}

#[test]
fn conditional_state_is_detected() {
	let use_text = Rc::new(Cell::new(false));
	let app = {
		let use_text = Rc::clone(&use_text);
		Component::new(move |hooks, _| {
			if use_text.get() {
				let (_, _) = hooks.use_state(String::new());
			} else {
				let (_, _) = hooks.use_state(0_i32);
			}
			Ok(vec![element("p").build()])
		})
	};
	let mut engine = Engine::new(MemoryHost::new());
	render(&mut engine, component(&app).build()).unwrap();
	let state_cells = engine.children(engine.current_root().unwrap()).map(|id| engine.fiber(id).unwrap().state_cell_count()).sum::<usize>();
	assert_eq!(state_cells, 1);

	use_text.set(true);
	let error = render(&mut engine, component(&app).build()).unwrap_err();
	assert!(matches!(error, Error::Invariant(Invariant::StateCellType { index: 0, .. })));
	assert_eq!(engine.host().markup(), "<p></p>");
}

#[test]
fn commit_failure_poisons() {
	let mut engine = Engine::new(MemoryHost::new());
	engine.host_mut().fail_next("append_child");

	let error = render(&mut engine, element("div").child(element("p")).build()).unwrap_err();
	assert!(matches!(error, Error::Commit { applied: 0, .. }));
	assert!(engine.is_poisoned());
	assert!(!engine.has_pending_work());
	assert!(matches!(engine.work_loop(&Unbounded), Err(Error::Poisoned)));

	let host = engine.into_host();
	assert_eq!(host.markup(), "");
}

#[test]
fn commit_failure_reports_applied_mutations() {
	let mut engine = Engine::new(MemoryHost::new());
	render(&mut engine, element("ul").child(element("li").attr("class", "a")).child(element("li")).build()).unwrap();

	engine.host_mut().fail_next("remove_child");
	let error = render(&mut engine, element("ul").child(element("li").attr("class", "b")).build()).unwrap_err();
	assert!(matches!(error, Error::Commit { applied: 0, .. }));

	let mut engine = Engine::new(MemoryHost::new());
	render(&mut engine, element("ul").child(element("li").attr("class", "a")).build()).unwrap();
	engine.host_mut().fail_next("append_child");
	let container = engine.host().container();
	engine.render(element("ul").child(element("li").attr("class", "b")).child(element("li")).build(), container);
	match engine.work_loop(&Unbounded) {
		Err(Error::Commit { applied, source }) => {
			assert_eq!(applied, 1);
			assert_eq!(source.operation(), "append_child");
		}
		other => panic!("unexpected result: {other:?}"),
	}
	assert!(engine.is_poisoned());
}

#[test]
fn slices_after_an_error_start_fresh() {
	let mut engine = Engine::new(MemoryHost::new());
	let container = engine.host().container();
	engine.render(element("div").child(element("p")).build(), container);
	engine.host_mut().fail_next("create_node");
	assert!(engine.work_loop(&Unbounded).is_err());
	assert_eq!(engine.work_loop(&Unbounded).unwrap(), Slice::Idle);
}
