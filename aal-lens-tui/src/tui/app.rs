use crate::tui::session::Session;
use crate::tui::theme::Theme;
use aal_lens_common::Config;
use aal_lens_core::classify::{goodness_of_variance_fit, summarize, ClassSummary};
use aal_lens_core::legend::{Legend, LegendStyle};
use aal_lens_core::palette::{ColorScale, Palette, PRESET_NAMES};
use aal_lens_core::{ClassMethod, ClassifyOptions};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Overview,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Focus {
    Chart,
    Legend,
}

/// Output of one background classification run.
#[derive(Debug, Clone)]
pub struct Classified {
    pub scale: ColorScale,
    pub summaries: Vec<ClassSummary>,
    pub gvf: f64,
    pub legend: Legend,
}

pub type ClassifyResult = (u64, Result<Classified, String>);

/// Pure work done off the UI thread.
pub fn classify_snapshot(values: &[Option<f64>], opts: &ClassifyOptions, title: &str) -> Result<Classified, String> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let scale = opts.color_scale(values).map_err(|e| e.to_string())?;
    let legend = opts.legend(title, &scale, values.len() - present.len());
    Ok(Classified {
        summaries: summarize(&present, &scale.breaks),
        gvf: goodness_of_variance_fit(&present, &scale.breaks),
        scale,
        legend,
    })
}

/// Runs `work`; a panic becomes an error result, so every spawned run reports back.
pub fn classify_guarded<F>(work: F) -> Result<Classified, String>
where
    F: FnOnce() -> Result<Classified, String>,
{
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".into());
        Err(format!("classification panicked: {msg}"))
    })
}

pub struct App {
    pub input_path: String,
    pub column: Option<String>,
    pub values: Vec<Option<f64>>,
    pub opts: ClassifyOptions,
    pub result: Option<Classified>,
    pub generation: u64,       // bumped on every settings change
    pub pending_classify: bool, // triggers spawn_blocking in the main loop
    pub in_flight: usize,
    pub result_tx: Sender<ClassifyResult>,
    pub result_rx: Receiver<ClassifyResult>,
    pub view: View,
    pub focus: Focus,
    pub legend_selected: usize,
    pub status_msg: String,
    pub should_quit: bool,
    pub config: Config,
    pub theme: Theme,
}

impl App {
    pub fn new(input_path: String, column: Option<String>, values: Vec<Option<f64>>, opts: ClassifyOptions, config: Config) -> Self {
        let theme = Theme::from_name(&config.display.theme);
        let (result_tx, result_rx) = channel();
        Self {
            input_path,
            column,
            values,
            opts,
            result: None,
            generation: 0,
            pending_classify: true,
            in_flight: 0,
            result_tx,
            result_rx,
            view: View::Overview,
            focus: Focus::Chart,
            legend_selected: 0,
            status_msg: String::new(),
            should_quit: false,
            config,
            theme,
        }
    }

    pub fn title(&self) -> String {
        self.column.clone().unwrap_or_else(|| self.input_path.clone())
    }

    pub fn observation_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn no_data_count(&self) -> usize {
        self.values.len() - self.observation_count()
    }

    /// Mark the current result stale and queue a new run.
    pub fn request_classify(&mut self) {
        self.generation += 1;
        self.pending_classify = true;
    }

    /// Take a finished run. Results from an older generation are dropped.
    pub fn accept_result(&mut self, generation: u64, result: Result<Classified, String>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if generation != self.generation {
            return false;
        }
        match result {
            Ok(c) => {
                self.status_msg = format!(
                    "{} | {} classes | GVF {:.3}",
                    self.opts.method.label(),
                    c.scale.breaks.class_count(),
                    c.gvf
                );
                self.legend_selected = self.legend_selected.min(c.legend.entries.len().saturating_sub(1));
                self.result = Some(c);
            }
            Err(e) => {
                self.status_msg = format!("classification failed: {e}");
                self.result = None;
            }
        }
        true
    }

    pub fn drain_results(&mut self) {
        while let Ok((generation, result)) = self.result_rx.try_recv() {
            self.accept_result(generation, result);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending_classify || self.in_flight > 0
    }

    pub fn requested_classes(&self) -> usize {
        self.opts.requested_classes(self.observation_count())
    }

    pub fn more_classes(&mut self) {
        let k = self.requested_classes();
        if k >= self.opts.palette.len() {
            self.status_msg = format!("{} has only {} colours", self.opts.palette.name, self.opts.palette.len());
            return;
        }
        self.opts.classes = Some(k + 1);
        self.request_classify();
    }

    pub fn fewer_classes(&mut self) {
        let k = self.requested_classes();
        if k <= 1 {
            return;
        }
        self.opts.classes = Some(k - 1);
        self.request_classify();
    }

    pub fn auto_classes(&mut self) {
        self.opts.classes = None;
        self.request_classify();
    }

    pub fn cycle_method(&mut self) {
        self.opts.method = self.opts.method.next();
        self.request_classify();
    }

    pub fn cycle_palette(&mut self) {
        let next = PRESET_NAMES
            .iter()
            .position(|n| *n == self.opts.palette.name)
            .map_or(0, |i| (i + 1) % PRESET_NAMES.len());
        if let Ok(p) = Palette::preset(PRESET_NAMES[next]) {
            self.set_palette(p);
        }
    }

    fn set_palette(&mut self, palette: Palette) {
        if let Some(k) = self.opts.classes {
            self.opts.classes = Some(k.min(palette.len()));
        }
        self.opts.palette = palette;
        self.request_classify();
    }

    pub fn toggle_legend_style(&mut self) {
        self.opts.legend.style = match self.opts.legend.style {
            LegendStyle::OpenEnded => LegendStyle::Range,
            LegendStyle::Range => LegendStyle::OpenEnded,
        };
        self.request_classify();
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Chart => Focus::Legend,
            Focus::Legend => Focus::Chart,
        };
    }

    pub fn legend_down(&mut self) {
        let n = self.result.as_ref().map_or(0, |r| r.legend.entries.len());
        if self.legend_selected + 1 < n {
            self.legend_selected += 1;
        }
    }

    pub fn legend_up(&mut self) {
        self.legend_selected = self.legend_selected.saturating_sub(1);
    }

    pub fn to_session(&self) -> Session {
        Session {
            input_path: self.input_path.clone(),
            method: self.opts.method.to_string(),
            classes: self.opts.classes,
            palette: self.opts.palette.name.clone(),
            legend_style: Some(
                match self.opts.legend.style {
                    LegendStyle::OpenEnded => "open",
                    LegendStyle::Range => "range",
                }
                .into(),
            ),
        }
    }

    /// Apply remembered settings; unknown values are ignored.
    pub fn restore_from_session(&mut self, s: &Session) {
        if let Ok(m) = s.method.parse::<ClassMethod>() {
            self.opts.method = m;
        }
        if let Ok(p) = Palette::preset(&s.palette) {
            self.opts.palette = p;
        }
        self.opts.classes = s.classes.map(|k| k.clamp(1, self.opts.palette.len()));
        if let Some(style) = s.legend_style.as_deref().and_then(|st| st.parse().ok()) {
            self.opts.legend.style = style;
        }
        self.request_classify();
    }
}
