use std::cell::RefCell;
use std::rc::Rc;

use trellis_render::{Color, CursorIcon, DrawCommand, HeadlessRenderer, Image, Rect, SolidImage};

use super::*;
use crate::event::MouseButton;
use crate::gui::GuiConfig;
use crate::widget::Container;

fn plain() -> Rc<Style> {
    Rc::new(Style::new())
}

fn text(s: &str) -> Rc<Element> {
    Element::text(plain(), s)
}

fn area_with(width: i32, elements: Vec<Rc<Element>>) -> (Gui, WidgetId, Rc<SimpleTextAreaModel>) {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_elements(&mut gui, elements);
    let area = gui.create(TextArea::new(Some(model.clone())));
    let root = gui.root_pane();
    gui.add(root, area);
    gui.set_position(area, 0, 0);
    gui.set_size(area, width, 200);
    gui.update();
    (gui, area, model)
}

/// Every drawn text run with its position.
fn runs(gui: &Gui) -> Vec<(String, i32, i32)> {
    let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
    renderer
        .commands()
        .iter()
        .filter_map(|cmd| match cmd {
            DrawCommand::Text { text, x, y, .. } => Some((text.clone(), *x, *y)),
            _ => None,
        })
        .collect()
}

fn run_at(gui: &Gui, s: &str) -> (i32, i32) {
    runs(gui)
        .into_iter()
        .find(|(t, _, _)| t == s)
        .map(|(_, x, y)| (x, y))
        .unwrap_or_else(|| panic!("{s:?} not drawn: {:?}", runs(gui)))
}

fn text_area(gui: &Gui, id: WidgetId) -> &TextArea {
    gui.widget::<TextArea>(id).unwrap()
}

fn click(gui: &mut Gui, x: i32, y: i32) {
    gui.handle_mouse(x, y, Some(MouseButton::Left), true);
    gui.handle_mouse(x, y, Some(MouseButton::Left), false);
}

#[test]
fn test_two_words_wrap_when_width_fits_one() {
    let (gui, id, _) = area_with(32, vec![text("aaaa bbbb")]);
    assert_eq!(run_at(&gui, "aaaa"), (0, 0));
    assert_eq!(run_at(&gui, "bbbb"), (0, 16));
    assert_eq!(text_area(&gui, id).content_height(), 32);
}

#[test]
fn test_word_wider_than_line_overflows() {
    let (gui, _, _) = area_with(16, vec![text("aaaa bbbb")]);
    assert_eq!(run_at(&gui, "aaaa"), (0, 0));
    assert_eq!(run_at(&gui, "bbbb"), (0, 16));
}

#[test]
fn test_break_word_splits_long_words() {
    let style = Rc::new(Style::new().with(&attributes::BREAK_WORD, true));
    let (gui, _, _) = area_with(16, vec![Element::text(style, "abcd")]);
    assert_eq!(run_at(&gui, "ab"), (0, 0));
    assert_eq!(run_at(&gui, "cd"), (0, 16));
}

#[test]
fn test_punctuation_stays_with_word() {
    let (gui, _, _) = area_with(48, vec![text("aaaa, bb")]);
    assert_eq!(run_at(&gui, "aaaa,"), (0, 0));
    assert_eq!(run_at(&gui, "bb"), (0, 16));
}

fn justified(width: i32) -> Gui {
    let p_style = Rc::new(Style::new().with(&attributes::HORIZONTAL_ALIGNMENT, HAlignment::Justify));
    let child = Element::text(Rc::new(Style::child_of(&p_style, None)), "aaaa bbbb cccc");
    area_with(width, vec![Element::paragraph(p_style, vec![child])]).0
}

#[test]
fn test_justify_spreads_small_slack() {
    let gui = justified(90);
    assert_eq!(run_at(&gui, "aaaa"), (0, 0));
    // 18px of slack is under a quarter of the line and goes into the single gap
    assert_eq!(run_at(&gui, "bbbb"), (58, 0));
    assert_eq!(run_at(&gui, "cccc"), (0, 16));
}

#[test]
fn test_justify_skips_large_slack() {
    let gui = justified(100);
    assert_eq!(run_at(&gui, "bbbb"), (40, 0));
}

#[test]
fn test_center_and_right_alignment() {
    let centered = Rc::new(Style::new().with(&attributes::HORIZONTAL_ALIGNMENT, HAlignment::Center));
    let right = Rc::new(Style::new().with(&attributes::HORIZONTAL_ALIGNMENT, HAlignment::Right));
    let (gui, _, _) = area_with(
        100,
        vec![
            Element::paragraph(Rc::clone(&centered), vec![Element::text(Rc::new(Style::child_of(&centered, None)), "ab")]),
            Element::paragraph(Rc::clone(&right), vec![Element::text(Rc::new(Style::child_of(&right, None)), "cd")]),
        ],
    );
    assert_eq!(run_at(&gui, "ab"), (42, 0));
    assert_eq!(run_at(&gui, "cd"), (84, 16));
}

#[test]
fn test_line_break_starts_new_line() {
    let (gui, _, _) = area_with(200, vec![text("one"), Element::line_break(plain()), text("two")]);
    assert_eq!(run_at(&gui, "one"), (0, 0));
    assert_eq!(run_at(&gui, "two"), (0, 16));
}

#[test]
fn test_preformatted_keeps_lines_and_tabs() {
    let style = Rc::new(
        Style::new()
            .with(&attributes::PREFORMATTED, true)
            .with(&attributes::TAB_SIZE, 4),
    );
    let (gui, _, _) = area_with(200, vec![Element::text(style, "a\tb\nc")]);
    assert_eq!(run_at(&gui, "a"), (0, 0));
    assert_eq!(run_at(&gui, "b"), (24, 0));
    assert_eq!(run_at(&gui, "c"), (0, 16));
}

#[test]
fn test_paragraph_margins_collapse() {
    let style = Rc::new(
        Style::new()
            .with(&attributes::MARGIN_TOP, Value::Px(4.0))
            .with(&attributes::MARGIN_BOTTOM, Value::Px(10.0)),
    );
    let p = |s: &str| Element::paragraph(Rc::clone(&style), vec![Element::text(Rc::new(Style::child_of(&style, None)), s)]);
    let (gui, _, _) = area_with(200, vec![p("one"), p("two")]);
    assert_eq!(run_at(&gui, "one"), (0, 4));
    // the larger bottom margin of the first paragraph wins over the top margin
    assert_eq!(run_at(&gui, "two"), (0, 30));
}

#[test]
fn test_ordered_list_labels_float_left() {
    let items = vec![
        Element::paragraph(plain(), vec![text("one")]),
        Element::paragraph(plain(), vec![text("two")]),
    ];
    let (gui, _, _) = area_with(200, vec![Element::ordered_list(plain(), 1, items)]);
    assert_eq!(run_at(&gui, "1. "), (0, 0));
    assert_eq!(run_at(&gui, "one"), (24, 0));
    assert_eq!(run_at(&gui, "2. "), (0, 16));
    assert_eq!(run_at(&gui, "two"), (24, 16));
}

#[test]
fn test_ordered_list_roman_numbering() {
    let style = Rc::new(Style::new().with(&attributes::LIST_STYLE_TYPE, OrderedListType::UpperRoman));
    let (gui, _, _) = area_with(200, vec![Element::ordered_list(style, 4, vec![text("x")])]);
    assert_eq!(run_at(&gui, "IV. "), (0, 0));
    assert_eq!(run_at(&gui, "x"), (32, 0));
}

#[test]
fn test_unordered_list_bullet_image() {
    let bullet: Rc<dyn Image> = Rc::new(SolidImage::new("bullet", 8, 8, Color::WHITE));
    let style = Rc::new(
        Style::new()
            .with(&attributes::LIST_STYLE_IMAGE, Some("bullet".to_owned()))
            .with(&attributes::PADDING_LEFT, Value::Px(4.0)),
    );
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_elements(&mut gui, vec![Element::list(style, vec![text("item")])]);
    let area = gui.create(TextArea::new(Some(model)));
    gui.with_widget::<TextArea, _>(area, |t, _| t.register_image("bullet", bullet));
    let root = gui.root_pane();
    gui.add(root, area);
    gui.set_position(area, 0, 0);
    gui.set_size(area, 200, 100);
    gui.update();

    assert_eq!(run_at(&gui, "item"), (12, 0));
    let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
    assert!(renderer.commands().iter().any(|cmd| matches!(
        cmd,
        DrawCommand::Image { name, rect, .. } if name == "bullet" && rect.x == 0
    )));
}

#[test]
fn test_float_left_block_wraps_text() {
    let float_style = Rc::new(
        Style::new()
            .with(&attributes::FLOAT_POSITION, FloatPosition::Left)
            .with(&attributes::WIDTH, Value::Px(40.0)),
    );
    let block = Element::block(Rc::clone(&float_style), vec![Element::text(Rc::new(Style::child_of(&float_style, None)), "f")]);
    let (gui, _, _) = area_with(200, vec![block, text("text")]);
    assert_eq!(run_at(&gui, "f"), (0, 0));
    assert_eq!(run_at(&gui, "text"), (40, 0));
}

fn image_rect(gui: &Gui, image: &str) -> Option<Rect> {
    let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
    renderer.commands().iter().find_map(|cmd| match cmd {
        DrawCommand::Image { name, rect, .. } if name == image => Some(*rect),
        _ => None,
    })
}

#[test]
fn test_floating_images_sit_at_the_edges() {
    let floated = |position: FloatPosition| Rc::new(Style::new().with(&attributes::FLOAT_POSITION, position));
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_elements(
        &mut gui,
        vec![
            Element::image(floated(FloatPosition::Left), "left", None),
            Element::image(floated(FloatPosition::Right), "right", None),
            text("text"),
        ],
    );
    let area = gui.create(TextArea::new(Some(model)));
    gui.with_widget::<TextArea, _>(area, |t, _| {
        t.register_image("left", Rc::new(SolidImage::new("left", 20, 10, Color::WHITE)));
        t.register_image("right", Rc::new(SolidImage::new("right", 20, 10, Color::WHITE)));
    });
    let root = gui.root_pane();
    gui.add(root, area);
    gui.set_position(area, 0, 0);
    gui.set_size(area, 200, 100);
    gui.update();

    assert_eq!(image_rect(&gui, "left").map(|r| (r.x, r.y)), Some((0, 0)));
    assert_eq!(image_rect(&gui, "right").map(|r| (r.x, r.y)), Some((180, 0)));
    assert_eq!(run_at(&gui, "text"), (20, 0));
}

#[test]
fn test_table_columns_use_natural_widths() {
    let mut table = TableElement::new(2, 1, 2, 0);
    table.set_cell(0, 0, Some(Element::table_cell(plain(), 1, vec![text("a")])));
    table.set_cell(0, 1, Some(Element::table_cell(plain(), 1, vec![text("b")])));
    let (gui, _, _) = area_with(200, vec![Element::table(plain(), table)]);
    assert_eq!(run_at(&gui, "a"), (2, 2));
    assert_eq!(run_at(&gui, "b"), (12, 2));
}

#[test]
fn test_table_background_color_is_painted() {
    let mut table = TableElement::new(1, 1, 0, 0);
    let cell_style = Rc::new(Style::new().with(&attributes::BACKGROUND_COLOR, Color::RED));
    table.set_cell(0, 0, Some(Element::table_cell(cell_style, 1, vec![text("a")])));
    let (gui, _, _) = area_with(200, vec![Element::table(plain(), table)]);
    let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
    assert!(renderer.commands().iter().any(|cmd| matches!(
        cmd,
        DrawCommand::FillRect { rect, color, .. } if *color == Color::RED && *rect == Rect::new(0, 0, 8, 16)
    )));
}

#[test]
fn test_element_rect_of_paragraphs() {
    let first = Element::paragraph(plain(), vec![text("one")]);
    let second = Element::paragraph(plain(), vec![text("two")]);
    let (gui, id, _) = area_with(200, vec![Rc::clone(&first), Rc::clone(&second)]);
    let area = text_area(&gui, id);
    assert_eq!(area.element_rect(&first), Some(Rect::new(0, 0, 200, 16)));
    assert_eq!(area.element_rect(&second), Some(Rect::new(0, 16, 200, 16)));
    assert_eq!(area.element_rect(&text("missing")), None);
}

#[test]
fn test_link_click_and_hover() {
    let link_style = Rc::new(Style::new().with(&attributes::COLOR_HOVER, Some(Color::RED)));
    let link = Element::link(
        Rc::clone(&link_style),
        "next",
        vec![Element::text(Rc::new(Style::child_of(&link_style, None)), "go")],
    );
    let (mut gui, id, _) = area_with(200, vec![link]);
    let clicked = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&clicked);
    text_area(&gui, id)
        .link_clicked
        .connect(move |_, href: &String| sink.borrow_mut().push(href.clone()));

    gui.handle_mouse(4, 4, None, false);
    gui.update();
    let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
    assert!(renderer.commands().iter().any(|cmd| matches!(
        cmd,
        DrawCommand::Text { text, color, .. } if text == "go" && *color == Color::RED
    )));
    assert_eq!(renderer.cursor(), Some(CursorIcon::Pointer));

    click(&mut gui, 4, 4);
    assert_eq!(*clicked.borrow(), vec!["next".to_owned()]);

    gui.handle_mouse(150, 150, None, false);
    gui.update();
    assert!(text_area(&gui, id).element_under_mouse().is_none());
}

#[test]
fn test_mouse_button_reports_element() {
    let run = text("hit");
    let (mut gui, id, _) = area_with(200, vec![Rc::clone(&run)]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    text_area(&gui, id)
        .mouse_button
        .connect(move |_, evt: &ElementMouseEvent| sink.borrow_mut().push(Rc::clone(&evt.element)));

    gui.handle_mouse(2, 2, None, false);
    click(&mut gui, 2, 2);
    let seen = seen.borrow();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|e| Rc::ptr_eq(e, &run)));
}

#[test]
fn test_registered_widget_is_laid_out_inline() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_elements(
        &mut gui,
        vec![Element::paragraph(
            plain(),
            vec![text("ab"), Element::widget(plain(), "w", None)],
        )],
    );
    let area = gui.create(TextArea::new(Some(model)));
    let embedded = gui.create(Container);
    gui.set_min_size(embedded, 20, 10);
    gui.with_widget::<TextArea, _>(area, |t, cx| t.register_widget(cx, "w", embedded));
    let root = gui.root_pane();
    gui.add(root, area);
    gui.set_position(area, 0, 0);
    gui.set_size(area, 200, 100);
    gui.update();

    assert_eq!(gui.parent_of(embedded), Some(area));
    let base = gui.base_of(embedded);
    assert_eq!((base.x(), base.y()), (16, 6));
    assert_eq!((base.width(), base.height()), (20, 10));

    gui.with_widget::<TextArea, _>(area, |t, cx| t.unregister_widget(cx, "w"));
    gui.update();
    assert_eq!(gui.parent_of(embedded), None);
    assert_eq!(gui.num_children(area), 0);
}

#[test]
#[should_panic(expected = "already registered")]
fn test_duplicate_widget_name_panics() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(100, 100)), GuiConfig::default());
    let area = gui.create(TextArea::default());
    let a = gui.create(Container);
    let b = gui.create(Container);
    gui.with_widget::<TextArea, _>(area, |t, cx| {
        t.register_widget(cx, "w", a);
        t.register_widget(cx, "w", b);
    });
}

struct ButtonResolver {
    created: Rc<RefCell<Vec<WidgetId>>>,
}

impl WidgetResolver for ButtonResolver {
    fn resolve_widget(&mut self, gui: &mut Gui, _name: &str, param: Option<&str>) -> Option<WidgetId> {
        let widget = gui.create(Container);
        let width = param.and_then(|p| p.parse().ok()).unwrap_or(10);
        gui.set_min_size(widget, width, 8);
        self.created.borrow_mut().push(widget);
        Some(widget)
    }
}

#[test]
fn test_resolved_widgets_are_disposed_on_relayout() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_elements(&mut gui, vec![Element::widget(plain(), "btn", Some("30".to_owned()))]);
    let created = Rc::new(RefCell::new(Vec::new()));
    let area = gui.create(TextArea::new(Some(model.clone())));
    let resolver = ButtonResolver {
        created: Rc::clone(&created),
    };
    gui.with_widget::<TextArea, _>(area, |t, _| t.register_widget_resolver("btn", Box::new(resolver)));
    let root = gui.root_pane();
    gui.add(root, area);
    gui.set_position(area, 0, 0);
    gui.set_size(area, 200, 100);
    gui.update();

    assert!(!created.borrow().is_empty());
    assert_eq!(gui.num_children(area), 1);
    let first = gui.children_of(area)[0];
    assert_eq!(gui.base_of(first).width(), 30);

    gui.set_size(area, 150, 100);
    gui.update();
    assert!(!gui.contains(first));
    assert_eq!(gui.num_children(area), 1);
}

#[test]
fn test_model_change_relayouts() {
    let (mut gui, _, model) = area_with(200, vec![text("before")]);
    assert!(runs(&gui).iter().any(|(t, _, _)| t == "before"));
    model.set_text(&mut gui, "after", false);
    gui.update();
    let drawn = runs(&gui);
    assert!(drawn.iter().any(|(t, _, _)| t == "after"));
    assert!(!drawn.iter().any(|(t, _, _)| t == "before"));
}

#[test]
fn test_preferred_size_from_scratch_layout() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_text(&mut gui, "hello\nhi", false);
    let area = gui.create(TextArea::new(Some(model)));
    assert_eq!(gui.preferred_width(area), 40);
    assert_eq!(gui.preferred_height(area), 32);
}

#[test]
fn test_default_style_sheet_adds_paragraph_margin() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTextAreaModel::new().shared();
    model.set_text(&mut gui, "one\ntwo", false);
    let area = gui.create(TextArea::new(Some(model)));
    gui.with_widget::<TextArea, _>(area, |t, cx| t.set_default_style_sheet(cx));
    let root = gui.root_pane();
    gui.add(root, area);
    gui.set_position(area, 0, 0);
    gui.set_size(area, 200, 100);
    gui.update();
    // 1em of the 8px wide monospace font
    assert_eq!(run_at(&gui, "two"), (0, 24));
}
