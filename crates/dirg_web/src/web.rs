use dirg::prelude::*;
use leptos::ev::MouseEvent;
use leptos::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use wasm_bindgen_futures::spawn_local;

mod fetch;
mod logging;
mod storage;

use fetch::FetchTransport;

const LOCALSTORAGE_SYNC_CONFIG_KEY: &str = "dirg.sync_config.v1";

pub fn start() {
    logging::init(LevelFilter::INFO);
    mount_to_body(|| view! { <App /> });
}

/// Paints frames from the sync loop into the reactive view model.
struct SignalSink(WriteSignal<GridView>);

impl GridSink for SignalSink {
    fn apply(&mut self, frame: &GridState) {
        self.0.update(|v| v.apply(frame));
    }
}

#[component]
fn App() -> impl IntoView {
    let layout = GridLayout::build();
    let (painted, set_painted) = signal(GridView::new());
    let (sync_state, set_sync_state) = signal(SyncState::Idle);

    let mut sync = SyncLoop::new(FetchTransport, storage::load_sync_config());
    let notifier = sync.notifier();
    let cancel = CancellationToken::new();

    // Mirror loop state into the page so it can be styled / inspected.
    {
        let mut states = sync.subscribe();
        spawn_local(async move {
            loop {
                set_sync_state.set(states.borrow_and_update().clone());
                if states.changed().await.is_err() {
                    break;
                }
            }
        });
    }

    {
        let cancel = cancel.clone();
        spawn_local(async move {
            let mut sink = SignalSink(set_painted);
            let reason = sync.run(&mut sink, &cancel).await;
            set_sync_state.set(SyncState::Stopped(reason));
        });
    }

    // Page teardown ends the long-poll chain.
    on_cleanup(move || cancel.cancel());

    let top_rows = table_rows(&layout.top, &notifier, painted);
    let grid_rows = table_rows(&layout.grid, &notifier, painted);
    let side_rows = table_rows(&layout.side, &notifier, painted);

    let sync_attr = move || match sync_state.get() {
        SyncState::Stopped(reason) => format!("stopped: {reason}"),
        other => other.label().to_string(),
    };

    view! {
        <table id="ui" attr:data-sync=sync_attr>
            <tr class={GridLayout::TOP_ROW_CLASS}>
                <td>
                    <table class=layout.top.class>{top_rows}</table>
                </td>
                <td></td>
            </tr>
            <tr class={GridLayout::MAIN_ROW_CLASS}>
                <td class={GridLayout::GRID_PARENT_CLASS}>
                    <table class=layout.grid.class>{grid_rows}</table>
                </td>
                <td>
                    <table class=layout.side.class>{side_rows}</table>
                </td>
            </tr>
        </table>
    }
}

fn table_rows(
    table: &TableSpec,
    notifier: &Notifier<FetchTransport>,
    painted: ReadSignal<GridView>,
) -> impl IntoView {
    table
        .rows
        .iter()
        .map(|row| {
            let cells = row
                .iter()
                .map(|cell| button_cell(cell, notifier.clone(), painted))
                .collect_view();
            view! { <tr>{cells}</tr> }
        })
        .collect_view()
}

fn button_cell(
    cell: &CellSpec,
    notifier: Notifier<FetchTransport>,
    painted: ReadSignal<GridView>,
) -> impl IntoView {
    let click = cell.click;
    let label = cell.label.clone().unwrap_or_default();

    // Only the background property is bound; an unset colour clears it.
    let background = move || match click.group {
        Group::Grid => painted.with(|v| {
            v.background(click.x as usize, click.y as usize)
                .unwrap_or_default()
                .to_string()
        }),
        Group::Top | Group::Side => String::new(),
    };

    let on_click = move |_: MouseEvent| {
        let notifier = notifier.clone();
        // Fire-and-forget; failures are logged by the notifier.
        spawn_local(async move {
            let _ = notifier.notify_click(click).await;
        });
    };

    view! {
        <td class=cell.class style:background-color=background on:click=on_click>
            {label}
        </td>
    }
}
