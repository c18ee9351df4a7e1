use crate::world::World;
use crate::{Plan, PlannerConfig, Result, State};
use std::fs;
use std::path::Path;

/// Renders a plan as a Graphviz DOT chain of states linked by actions.
pub struct PlanVisualizer;

impl PlanVisualizer {
    pub fn new() -> Self {
        Self
    }

    /// Builds the DOT source for `plan` replayed from `start`.
    ///
    /// Steps whose precondition fails are drawn in red and end the chain.
    pub fn render(&self, world: &World, start: &State, plan: &Plan, config: &PlannerConfig) -> String {
        let mut lines = vec![
            "digraph Plan {".to_string(),
            "    rankdir=TB;".to_string(),
            "    node [shape=box, style=filled, fillcolor=lightblue];".to_string(),
            "    edge [fontsize=10];".to_string(),
            format!(
                "    state_0 [label=\"Start\\n{}\", fillcolor=lightgreen];",
                Self::label(start)
            ),
        ];

        let mut state = start.clone();
        let mut g = 0;
        for (i, action) in plan.iter().enumerate() {
            if !action.is_applicable(&state, world, config) {
                lines.push(format!(
                    "    state_{} -> invalid [label=\"{}\", color=red];",
                    i, action
                ));
                lines.push(
                    "    invalid [label=\"Precondition failed\", fillcolor=lightcoral];".to_string(),
                );
                break;
            }
            state = action.apply(&state, world, config);
            g += action.cost();
            let fill = if state.is_goal(config) {
                ", fillcolor=lightpink"
            } else {
                ""
            };
            lines.push(format!(
                "    state_{} [label=\"g={}\\n{}\"{}];",
                i + 1,
                g,
                Self::label(&state),
                fill
            ));
            lines.push(format!(
                "    state_{} -> state_{} [label=\"{} ({})\"];",
                i,
                i + 1,
                action,
                action.cost()
            ));
        }

        lines.push("}".to_string());
        lines.join("\n") + "\n"
    }

    /// Writes the DOT source to `path`.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        world: &World,
        start: &State,
        plan: &Plan,
        config: &PlannerConfig,
    ) -> Result<()> {
        fs::write(path, self.render(world, start, plan, config))?;
        Ok(())
    }

    fn label(state: &State) -> String {
        state.to_string().replace(" | ", "\\n")
    }
}

impl Default for PlanVisualizer {
    fn default() -> Self {
        Self::new()
    }
}
