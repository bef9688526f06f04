//! Routes command - prints the route table the gate classifies against

use crate::domain::endpoint::RouteTable;

pub fn run() -> anyhow::Result<()> {
    print!("{}", render(&RouteTable::quotes()));
    Ok(())
}

fn render(routes: &RouteTable) -> String {
    let width = routes
        .routes()
        .iter()
        .map(|route| route.pattern().len())
        .max()
        .unwrap_or(0);

    routes
        .routes()
        .iter()
        .map(|route| format!("{:<width$}  {}\n", route.pattern(), route.class(), width = width))
        .collect()
}
