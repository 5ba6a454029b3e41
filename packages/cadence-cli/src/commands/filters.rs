use crate::cli::FiltersArgs;
use crate::exit_codes;
use crate::output;
use cadence_rs::FilterKind;

pub fn execute(args: FiltersArgs) -> i32 {
    let catalog = FilterKind::catalog();

    if args.json {
        if let Err(e) = output::emit(&catalog, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("Available Filters:\n");
        println!("  {:<18} {:<32} {:<10}", "Selector", "Parameter", "Default");
        println!("  {}", "-".repeat(62));
        for d in &catalog {
            match d.params.split_first() {
                None => println!("  {:<18} {:<32} {:<10}", d.selector, "-", "-"),
                Some((first, rest)) => {
                    println!("  {:<18} {:<32} {:<10}", d.selector, first.label, first.default);
                    for p in rest {
                        println!("  {:<18} {:<32} {:<10}", "", p.label, p.default);
                    }
                }
            }
        }
        println!();
        println!("Usage: --filter <selector> --param1 <value> [--param2 <value>]");
    }

    exit_codes::SUCCESS
}
