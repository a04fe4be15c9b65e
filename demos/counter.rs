use kasane::*;

fn print_tree(instance: &Instance, depth: usize) {
    let text = instance.get("Text");
    let visible = instance.get("Visible");
    let mut line = format!("{:indent$}{} \"{}\"", "", instance.class_name(), instance.name(), indent = depth * 2);
    if !text.is_nil() {
        line += &format!(" Text={text}");
    }
    if visible == Value::Bool(false) {
        line += " (hidden)";
    }
    println!("{line}");
    for child in instance.children() {
        print_tree(&child, depth + 1);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("kasane=debug")).init();

    // Stands in for the host's retained scene graph. A real host would render it.
    let screen = Instance::new("ScreenGui");

    let mut ui = Ui::new(screen.clone());
    ui.init()?;

    #[widget_key] const INCREASE: WidgetKey;
    #[widget_key] const SHOW: WidgetKey;

    let count = ui.state(0);
    let show = ui.state(true);

    let count_2 = count.clone();
    let show_2 = show.clone();
    ui.connect(move |ui| {
        let count = count_2.get().as_number().unwrap_or(0.0);

        ui.window("Counter")?;

        if show_2.get().truthy() {
            ui.set_next_widget_id(INCREASE);
            if ui.button("Increase")?.clicked() {
                count_2.set(count + 1.0);
            }
            ui.text(format!("Count: {count}"))?;
        }

        ui.set_next_widget_id(SHOW);
        ui.checkbox_with_state("Show counter", &show_2)?;

        ui.end()?;
        Ok(())
    });

    ui.run_cycle()?;

    // The host's input handling fires signals on its objects between cycles.
    let click_increase = |ui: &Ui| {
        if let Some(button) = ui.get_widget(&INCREASE.id()).and_then(|b| b.instance()) {
            button.signal("Activated").fire();
        }
    };

    for _ in 0..3 {
        click_increase(&ui);
        ui.run_cycle()?;
    }
    // the last click is only seen by this cycle
    ui.run_cycle()?;

    println!("After three clicks:");
    print_tree(&screen, 0);

    // Hide the counter through the checkbox
    if let Some(checkbox) = ui.get_widget(&SHOW.id()).and_then(|c| c.instance()) {
        checkbox.signal("Activated").fire();
    }
    ui.run_cycle()?;

    println!("\nWith the counter hidden:");
    print_tree(&screen, 0);

    ui.shutdown()?;
    return Ok(());
}
