// Licensed under the Apache-2.0 license

//! End-to-end scenarios driving compiled register files through the
//! reference simulator: a paged peripheral block, a stream pair with
//! overrun/underrun interrupts, and a hardened multi-word counter.

use regfile_compiler::{compile, RegFileConfig};
use regfile_sim::{CtrlOp, Response, Simulator};

fn simulate(text: &str) -> Simulator {
    let cfg = RegFileConfig::from_json(text).unwrap();
    Simulator::new(compile(&cfg).unwrap()).unwrap()
}

/// A peripheral register file that is only decoded while an external page
/// selector holds its page: a software control, a hardware status, a
/// divisor driven out on a port and a busy bit mirrored from an input.
#[test]
fn test_paged_peripheral_block() {
    let mut sim = simulate(
        r#"{
          "metadata": { "name": "periph", "brief": "paged peripheral block" },
          "internal-io": [
            { "direction": "input", "internal": "page:2" },
            { "direction": "input", "internal": "busy" },
            { "direction": "output", "internal": "div" }
          ],
          "conditions": [
            { "internal": "page:2", "value": 1 }
          ],
          "fields": [
            { "address": "0x0:7..0", "metadata": { "name": "mode" },
              "behavior": { "kind": "control", "reset": 0 } },
            { "address": "0x4:15..0", "metadata": { "name": "stat" },
              "behavior": { "kind": "status" } },
            { "address": "0x8:7..0", "metadata": { "name": "divisor" },
              "behavior": { "kind": "internal-control", "internal": "div",
                            "reset": 1 } },
            { "address": "0xC:0", "metadata": { "name": "busy_now" },
              "behavior": { "kind": "internal-status", "internal": "busy" } }
          ]
        }"#,
    );

    // Page 0: the file is not decoded at all.
    assert_eq!(sim.read(0x0), Response::DecodeError);
    assert_eq!(sim.write(0x0, 0x3F), Response::DecodeError);

    sim.set_input("page", 1).unwrap();
    assert_eq!(sim.write(0x0, 0x3F), Response::Okay(0));
    assert_eq!(sim.read(0x0), Response::Okay(0x3F));

    // The status register follows the hardware side.
    assert!(sim.hw_write("stat", 0xBEE).unwrap());
    assert_eq!(sim.read(0x4), Response::Okay(0xBEE));

    // The divisor register drives its output port.
    assert_eq!(sim.output("div").unwrap(), 1, "reset value on the port");
    assert_eq!(sim.write(0x8, 0x28), Response::Okay(0));
    assert_eq!(sim.output("div").unwrap(), 0x28);

    // The busy bit mirrors the input level.
    assert_eq!(sim.read(0xC), Response::Okay(0));
    sim.set_input("busy", 1).unwrap();
    assert_eq!(sim.read(0xC), Response::Okay(1));
    sim.set_input("busy", 0).unwrap();
    assert_eq!(sim.read(0xC), Response::Okay(0));

    // Switching the page away unmaps the file again, state intact.
    sim.set_input("page", 2).unwrap();
    assert_eq!(sim.read(0x0), Response::DecodeError);
    sim.set_input("page", 1).unwrap();
    assert_eq!(sim.read(0x0), Response::Okay(0x3F));
}

/// A UART-style stream pair: an outgoing MMIO-to-stream register, an
/// incoming stream-to-MMIO register, and latching interrupts raised by the
/// overrun and underrun strobes.
#[test]
fn test_stream_pair_with_interrupts() {
    let mut sim = simulate(
        r#"{
          "metadata": { "name": "uart" },
          "internal-io": [
            { "direction": "output", "internal": "tx_full" }
          ],
          "interrupts": [
            { "metadata": { "name": "ovr" }, "internal": "tx_ovr" },
            { "metadata": { "name": "udr" }, "internal": "rx_udr" }
          ],
          "fields": [
            { "address": "0x0:7..0", "metadata": { "name": "tx" },
              "behavior": { "kind": "mmio-to-stream",
                            "full-internal": "tx_full",
                            "overrun-internal": "tx_ovr" } },
            { "address": "0x4:7..0", "metadata": { "name": "rx" },
              "behavior": { "kind": "stream-to-mmio",
                            "underrun-internal": "rx_udr" } },
            { "address": "0x8:0", "metadata": { "name": "ovr_flag" },
              "behavior": { "kind": "interrupt-flag", "interrupt": "ovr" } },
            { "address": "0x8:1", "metadata": { "name": "udr_flag" },
              "behavior": { "kind": "interrupt-flag", "interrupt": "udr" } }
          ]
        }"#,
    );

    // Transmit path: the first write fills the holding register.
    assert_eq!(sim.write(0x0, 0x41), Response::Okay(0));
    assert_eq!(sim.output("tx_full").unwrap(), 1);
    assert!(!sim.irq());

    // A second write while full is dropped and latches the overrun flag.
    assert_eq!(sim.write(0x0, 0x42), Response::Okay(0));
    assert!(sim.irq());
    assert_eq!(sim.read(0x8), Response::Okay(0b01));

    // The stream side consumes the pending byte.
    assert_eq!(sim.hw_read("tx").unwrap(), Some(0x41));
    sim.ctrl("tx", CtrlOp::Ready).unwrap();
    assert_eq!(sim.output("tx_full").unwrap(), 0);
    assert_eq!(sim.write(0x0, 0x42), Response::Okay(0));

    // Write-one-to-clear drops the overrun flag.
    assert_eq!(sim.write(0x8, 0b01), Response::Okay(0));
    assert!(!sim.irq());

    // Receive path: a byte from the stream side, popped by the bus read.
    assert!(sim.hw_write("rx", 0x7E).unwrap());
    assert_eq!(sim.read(0x4), Response::Okay(0x7E));

    // Reading the empty holding register underruns; the data bits are
    // whatever the register last held.
    assert_eq!(sim.read(0x4), Response::Okay(0x7E));
    assert!(sim.irq());
    assert_eq!(sim.read(0x8), Response::Okay(0b10));
    assert_eq!(sim.write(0x8, 0b10), Response::Okay(0));
    assert!(!sim.irq());
}

/// A privileged-only 64-bit counter on a 32-bit bus: multi-word accesses go
/// through the holding registers, and a less privileged master that
/// interleaves a sequence in progress is refused while the privileged
/// sequence completes untouched.
#[test]
fn test_hardened_wide_counter() {
    let mut sim = simulate(
        r#"{
          "metadata": { "name": "perfctr" },
          "fields": [
            { "address": "0x0:63..0", "metadata": { "name": "total" },
              "behavior": { "kind": "counter", "hw-write": "accumulate" },
              "permissions": { "user": false } },
            { "address": "0x8:7..0", "metadata": { "name": "note" },
              "behavior": { "kind": "control", "reset": 0 } }
          ]
        }"#,
    );
    let prot = 0b001;

    for _ in 0..3 {
        sim.ctrl("total", CtrlOp::Increment).unwrap();
    }
    assert_eq!(sim.read_prot(0x0, prot), Response::Okay(3));
    assert_eq!(sim.read_prot(0x4, prot), Response::Okay(0));
    assert_eq!(sim.read_holding(), 0, "the holding register is scrubbed");

    // Push the counter past 32 bits.
    assert!(sim.hw_write("total", 0x1_0000_0002).unwrap());
    assert_eq!(sim.field_value("total").unwrap(), 0x1_0000_0005);

    // A less privileged master interleaves between the two words of a
    // privileged read: the interloper gets the slave error, even on the
    // otherwise user-readable register, and the privileged sequence still
    // sees a consistent value.
    assert_eq!(sim.read_prot(0x0, prot), Response::Okay(0x0000_0005));
    assert_eq!(sim.read(0x8), Response::SlaveError);
    assert_eq!(sim.read_prot(0x4, prot), Response::Okay(0x0000_0001));
    assert_eq!(sim.read_holding(), 0, "no data lingers in the holding register");

    // Once the sequence is over the open register decodes again.
    assert_eq!(sim.read(0x8), Response::Okay(0));

    // An equally trusted access in between is tolerated.
    assert_eq!(sim.read_prot(0x0, prot), Response::Okay(0x0000_0005));
    assert_eq!(sim.read_prot(0x8, prot), Response::Okay(0));
    assert_eq!(sim.read_prot(0x4, prot), Response::Okay(0x0000_0001));

    // The bus retires events with a two-word subtract write; an
    // interleaving user word is refused and never reaches the sequence.
    assert_eq!(sim.write_prot(0x0, 5, prot), Response::Okay(0));
    assert_eq!(sim.write(0x0, 0xFFFF_FFFF), Response::SlaveError);
    assert_eq!(sim.field_value("total").unwrap(), 0x1_0000_0005, "not committed yet");
    assert_eq!(sim.write_prot(0x4, 0, prot), Response::Okay(0));
    assert_eq!(sim.field_value("total").unwrap(), 0x1_0000_0000);

    // With nothing in flight, accesses the counter refuses are decode
    // misses, not acknowledgements.
    assert_eq!(sim.read(0x0), Response::DecodeError);
    assert_eq!(sim.write(0x0, 1), Response::DecodeError);
}
