use crate::tui::app::{App, Focus, View};
use aal_lens_core::export::{export_json, ClassificationReport};
use crossterm::event::{KeyCode, KeyEvent};
use std::path::Path;

pub fn handle_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab => {
            app.cycle_focus();
            return;
        }
        KeyCode::Char('?') => {
            app.view = if app.view == View::Help { View::Overview } else { View::Help };
            return;
        }
        KeyCode::Esc if app.view == View::Help => {
            app.view = View::Overview;
            return;
        }
        _ => {}
    }
    match key.code {
        KeyCode::Char('+') | KeyCode::Char('=') => app.more_classes(),
        KeyCode::Char('-') => app.fewer_classes(),
        KeyCode::Char('a') => app.auto_classes(),
        KeyCode::Char('m') => app.cycle_method(),
        KeyCode::Char('p') => app.cycle_palette(),
        KeyCode::Char('s') => app.toggle_legend_style(),
        KeyCode::Char('e') => export_report(app),
        KeyCode::Char('j') | KeyCode::Down if app.focus == Focus::Legend => app.legend_down(),
        KeyCode::Char('k') | KeyCode::Up if app.focus == Focus::Legend => app.legend_up(),
        _ => {}
    }
}

fn export_report(app: &mut App) {
    let dir = Path::new(&app.config.export.output_dir);
    let out = dir.join("aal-lens-report.json");
    let result = ClassificationReport::build(&app.input_path, app.column.as_deref(), &app.values, &app.opts)
        .and_then(|report| export_json(&out, &report));
    app.status_msg = match result {
        Ok(()) => format!("report written to {}", out.display()),
        Err(e) => format!("export failed: {e}"),
    };
}
